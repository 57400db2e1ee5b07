//! Coordinator transport: the [`Coordinator`] seam and its HTTP implementation.
mod config;
pub use config::ConnectConfig;

mod errors;
pub use errors::ConnectError;

mod coordinator;
pub use coordinator::Coordinator;

mod http;
pub use http::{DEVICE_ID_HEADER, DEVICE_INFO_HEADER, HttpConnection, USER_INFO_HEADER};
