use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Snapshot of the training methods a device advertises.
///
/// Serialized as `{"methods": [...]}` in job requests; methods are kept sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub methods: BTreeSet<String>,
}

impl Capabilities {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    pub fn supports(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
