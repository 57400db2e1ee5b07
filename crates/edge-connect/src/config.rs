use std::{collections::BTreeMap, time::Duration};

use reqwest::Url;

use crate::ConnectError;

/// Coordinator endpoint and device identity.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Base URL, e.g. `https://coordinator:8443`.
    pub endpoint: String,
    pub device_id: String,
    pub device_info: BTreeMap<String, String>,
    pub user_info: BTreeMap<String, String>,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            device_id: edge_core::device_id().to_string(),
            device_info: edge_core::device_info(),
            user_info: BTreeMap::new(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConnectConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("endpoint is empty".into()));
        }
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ConnectError::InvalidConfig(format!("endpoint {}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConnectError::InvalidConfig(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        if self.device_id.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("device id is empty".into()));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConnectError::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }
}
