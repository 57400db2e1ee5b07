use std::{fmt, sync::Arc};

use edge_model::Dxo;
use tracing::trace;

use crate::{Context, CoreError, Filter, Signal};

/// Ordered list of filters applied one after another.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<(String, Arc<dyn Filter>)>,
}

impl FilterChain {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, filter: Arc<dyn Filter>) {
        self.filters.push((label.into(), filter));
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &FilterChain) -> FilterChain {
        let mut filters = self.filters.clone();
        filters.extend(other.filters.iter().cloned());
        FilterChain { filters }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `input` through every filter in order.
    ///
    /// A filter error ends the chain as reported by the filter; a malformed output DXO ends it with [`CoreError::Contract`].
    pub async fn apply(
        &self,
        stage: &str,
        mut input: Dxo,
        ctx: &Context,
        signal: &Signal,
    ) -> Result<Dxo, CoreError> {
        for (label, filter) in &self.filters {
            if signal.is_triggered() {
                return Err(CoreError::Aborted);
            }
            trace!(stage, filter = %label, "applying filter");
            let output = filter
                .filter(input, ctx, signal)
                .await
                .map_err(|e| e.in_stage(format!("{stage} {label}")))?;
            output.validate().map_err(|e| CoreError::Contract {
                stage: format!("{stage} {label}"),
                reason: e.to_string(),
            })?;
            input = output;
        }
        Ok(input)
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|(label, _)| label))
            .finish()
    }
}
