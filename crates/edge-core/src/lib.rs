//! Runtime building blocks of the edge runner: the stop [`Signal`], the per-job [`Context`], component traits and their [`ComponentRegistry`], job configuration and the filter pipeline.
pub mod error;
pub use error::CoreError;

mod signal;
pub use signal::Signal;

pub mod context;
pub use context::{Context, ContextValue};

mod component;
pub use component::{Batch, DataSource, Dataset, Event, EventHandler, EventKind, Executor, Filter, Trainer};

pub mod registry;
pub use registry::{Component, ComponentArgs, ComponentRegistry};

pub mod config;
pub use config::{JobConfig, ResolvedJob};

mod pipeline;
pub use pipeline::FilterChain;

mod capabilities;
pub use capabilities::SharedCapabilities;

mod metrics;
pub use metrics::{MetricsBackend, NoopMetrics, RetryReason, TaskOutcome};

mod progress;
pub use progress::{NoopProgress, ProgressFn, ProgressSink};

mod system;
pub use system::{arch, device_id, device_info, init_uptime, os_info, platform, uptime_seconds};
