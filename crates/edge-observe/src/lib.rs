//! Logging setup and progress sinks for edge runner hosts.
mod logger;
pub use logger::*;

mod progress;
pub use progress::{ChainProgress, LogProgress};
