use std::sync::Arc;

use async_trait::async_trait;
use edge_model::Dxo;
use serde_json::Value;

use crate::{Context, CoreError, Signal};

/// Consumes a task DXO and produces a result DXO.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, input: Dxo, ctx: &Context, signal: &Signal) -> Result<Dxo, CoreError>;
}

/// DXO → DXO transformation applied before or after execution.
///
/// Filters are only observable through their return value.
#[async_trait]
pub trait Filter: Send + Sync {
    async fn filter(&self, input: Dxo, ctx: &Context, signal: &Signal) -> Result<Dxo, CoreError>;
}

/// Observer of pipeline events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event, ctx: &Context, signal: &Signal);
}

/// Opaque training kernel behind the built-in trainer executor.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(
        &self,
        input: Dxo,
        dataset: Arc<dyn Dataset>,
        ctx: &Context,
        signal: &Signal,
    ) -> Result<Dxo, CoreError>;
}

/// One input/label pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub input: Value,
    pub label: Value,
}

/// Training data for a job, supplied by the host.
///
/// Implementations use interior mutability for their cursor; the runner shares one dataset per job.
pub trait Dataset: Send + Sync {
    fn size(&self) -> usize;
    /// Next batch of at most `batch_size` samples, `None` once the epoch is exhausted.
    fn next_batch(&self, batch_size: usize) -> Option<Batch>;
    fn reset(&self);
}

/// Host-side provider of datasets, looked up by job name.
pub trait DataSource: Send + Sync {
    fn dataset(&self, job_name: &str, ctx: &Context) -> Result<Arc<dyn Dataset>, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    BeforeTrain,
    AfterTrain,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BeforeTrain => "before_train",
            EventKind::AfterTrain => "after_train",
        }
    }
}

/// Pipeline event delivered to every [`EventHandler`] of a job.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    /// Milliseconds since the unix epoch.
    pub timestamp_ms: u64,
    /// Executor output, set on [`EventKind::AfterTrain`].
    pub output: Option<Dxo>,
}

impl Event {
    pub fn before_train(timestamp_ms: u64) -> Self {
        Self {
            kind: EventKind::BeforeTrain,
            timestamp_ms,
            output: None,
        }
    }

    pub fn after_train(timestamp_ms: u64, output: Dxo) -> Self {
        Self {
            kind: EventKind::AfterTrain,
            timestamp_ms,
            output: Some(output),
        }
    }
}
