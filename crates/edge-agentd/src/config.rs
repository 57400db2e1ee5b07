use std::{str::FromStr, time::Duration};

use anyhow::{Context as _, bail};
use edge_observe::{LoggerFormat, LoggerLevel};

/// Agent settings read from `EDGE_*` environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub endpoint: String,
    pub job_name: String,
    pub job_timeout: Duration,
    pub device_id: Option<String>,
    /// Advertised methods; the trainer table is used when empty.
    pub methods: Vec<String>,
    pub log_level: LoggerLevel,
    pub log_format: LoggerFormat,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let job_timeout = match var("EDGE_JOB_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = u64::from_str(&raw)
                    .with_context(|| format!("EDGE_JOB_TIMEOUT_SECS={raw} is not a number"))?;
                if secs == 0 {
                    bail!("EDGE_JOB_TIMEOUT_SECS must be positive");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(600),
        };

        let log_level = match var("EDGE_LOG_LEVEL") {
            Some(raw) => LoggerLevel::new(raw)?,
            None => LoggerLevel::default(),
        };
        let log_format = match var("EDGE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LoggerFormat::Text,
        };

        Ok(Self {
            endpoint: var("EDGE_ENDPOINT").unwrap_or_else(|| "http://127.0.0.1:8080".to_string()),
            job_name: var("EDGE_JOB_NAME").unwrap_or_else(|| "demo".to_string()),
            job_timeout,
            device_id: var("EDGE_DEVICE_ID"),
            methods: var("EDGE_METHODS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            log_level,
            log_format,
        })
    }
}
