use async_trait::async_trait;
use edge_core::{Context, CoreError, Event, EventHandler, Filter, Signal};
use edge_model::Dxo;
use tracing::trace;

/// Passes its input through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpFilter;

#[async_trait]
impl Filter for NoOpFilter {
    async fn filter(&self, input: Dxo, _ctx: &Context, _signal: &Signal) -> Result<Dxo, CoreError> {
        Ok(input)
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventHandler;

#[async_trait]
impl EventHandler for NoOpEventHandler {
    async fn handle_event(&self, event: &Event, _ctx: &Context, _signal: &Signal) {
        trace!(kind = event.kind.as_str(), "event ignored");
    }
}
