//! Session runner: acquires jobs and tasks from a coordinator and drives every task through the filter → execute → filter pipeline.
mod config;
pub use config::RunnerConfig;

mod error;
pub use error::RunnerError;

mod handle;
pub use handle::{RunnerHandle, SessionOutcome};

mod runner;
pub use runner::{RunnerBuilder, SessionRunner};

pub mod prelude {
    pub use crate::{RunnerConfig, RunnerError, RunnerHandle, SessionOutcome, SessionRunner};
    pub use edge_connect::{ConnectConfig, Coordinator, HttpConnection};
    pub use edge_core::{
        ComponentRegistry, Context, DataSource, Dataset, Executor, Filter, MetricsBackend,
        ProgressSink, Signal, Trainer,
    };
    pub use edge_model::{Dxo, Progress};
}
