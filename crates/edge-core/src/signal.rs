use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Cooperative abort flag shared by the runner, its components and the host.
///
/// The first [`Signal::trigger`] wins and its payload is kept; later calls are no-ops.
/// There is no reset: a triggered signal stays triggered for the lifetime of the runner.
#[derive(Clone, Debug, Default)]
pub struct Signal {
    token: CancellationToken,
    payload: Arc<OnceLock<Option<Value>>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal; returns `true` if this call was the one that set it.
    pub fn trigger(&self, payload: Option<Value>) -> bool {
        let first = self.payload.set(payload).is_ok();
        self.token.cancel();
        first
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Payload passed by the first trigger.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.get().and_then(Option::as_ref)
    }

    /// Resolves once the signal is triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Underlying token, for components that race their own work against a stop.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
