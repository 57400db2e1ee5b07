//! Domain types shared by every edge runner crate.
//!
//! Nothing in here performs I/O: these are the payloads exchanged with the coordinator, the data envelope passed through the filter/executor pipeline and the progress records delivered to the host.

mod error;
pub use error::ModelError;

mod dxo;
pub use dxo::{DataKind, Dxo, DxoMap};

mod cookie;
pub use cookie::Cookie;

mod status;
pub use status::{Status, StatusClass};

mod job;
pub use job::{Job, JobStatus};

mod task;
pub use task::{META_CONTRIBUTION_ROUND, META_NUM_ROUNDS, Task};

mod capabilities;
pub use capabilities::Capabilities;

mod progress;
pub use progress::{Phase, Progress, Rounds};

pub mod wire;

/// Identifier assigned by the coordinator to a job.
pub type JobId = String;

/// Identifier assigned by the coordinator to a single task.
pub type TaskId = String;
