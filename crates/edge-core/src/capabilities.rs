use std::{
    collections::BTreeSet,
    sync::{Arc, PoisonError, RwLock},
};

use edge_model::Capabilities;
use tracing::debug;

/// Method set advertised on every job request, mutable from the host while a session runs.
#[derive(Debug, Clone, Default)]
pub struct SharedCapabilities {
    methods: Arc<RwLock<BTreeSet<String>>>,
}

impl SharedCapabilities {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: Arc::new(RwLock::new(methods.into_iter().map(Into::into).collect())),
        }
    }

    /// Copy of the current set, as sent to the coordinator.
    pub fn snapshot(&self) -> Capabilities {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        Capabilities::new(methods.iter().cloned())
    }

    /// Flip `method`; returns whether it is enabled afterwards.
    pub fn toggle(&self, method: &str) -> bool {
        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        let enabled = if methods.remove(method) {
            false
        } else {
            methods.insert(method.to_string());
            true
        };
        debug!(method, enabled, "capability toggled");
        enabled
    }

    pub fn enable(&self, method: &str) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.to_string());
    }

    pub fn disable(&self, method: &str) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(method);
    }

    /// Replace the whole set.
    pub fn set<I, S>(&self, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.methods.write().unwrap_or_else(PoisonError::into_inner) =
            methods.into_iter().map(Into::into).collect();
    }
}
