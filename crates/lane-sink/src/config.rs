//! Sink configuration
//!
//! Keys (relative to an optional prefix):
//! - `es.host`: comma-separated `host:port` or URLs (required)
//! - `es.bulk.flush.max.actions`: actions per batch (default 1000)
//! - `es.bulk.flush.max.size.mb`: batch size in MB (default 5)
//! - `es.bulk.flush.interval`: flush interval in ms (default none)
//! - `es.bulk.flush.backoff.enable`: retry rejected batches (default false)
//! - `es.bulk.flush.backoff.type`: `CONSTANT` or `EXPONENTIAL` (default CONSTANT)
//! - `es.bulk.flush.backoff.retries`: retry count (default 3)
//! - `es.bulk.flush.backoff.delay`: delay in ms (default 50)
//! - `es.flush.on.checkpoint.disable`: skip flushing on checkpoint (default false)

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SinkConfigError;

pub const HOST: &str = "es.host";
pub const MAX_ACTIONS: &str = "es.bulk.flush.max.actions";
pub const MAX_SIZE_MB: &str = "es.bulk.flush.max.size.mb";
pub const INTERVAL: &str = "es.bulk.flush.interval";
pub const BACKOFF_ENABLE: &str = "es.bulk.flush.backoff.enable";
pub const BACKOFF_TYPE: &str = "es.bulk.flush.backoff.type";
pub const BACKOFF_RETRIES: &str = "es.bulk.flush.backoff.retries";
pub const BACKOFF_DELAY: &str = "es.bulk.flush.backoff.delay";
pub const FLUSH_ON_CHECKPOINT_DISABLE: &str = "es.flush.on.checkpoint.disable";

const MB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffType {
    Constant,
    Exponential,
}

impl FromStr for BackoffType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSTANT" => Ok(BackoffType::Constant),
            "EXPONENTIAL" => Ok(BackoffType::Exponential),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BackoffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffType::Constant => f.write_str("CONSTANT"),
            BackoffType::Exponential => f.write_str("EXPONENTIAL"),
        }
    }
}

/// Retry policy for rejected batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub kind: BackoffType,
    pub retries: u32,
    pub delay: Duration,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.kind {
            BackoffType::Constant => self.delay,
            BackoffType::Exponential => self.delay.saturating_mul(1u32 << attempt.min(16)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Backend endpoints, always with a scheme
    pub hosts: Vec<String>,
    pub max_actions: usize,
    pub max_size_bytes: usize,
    pub flush_interval: Option<Duration>,
    /// None when backoff is disabled
    pub backoff: Option<BackoffPolicy>,
    pub flush_on_checkpoint: bool,
}

impl SinkConfig {
    /// Config for `hosts` with every other setting at its default
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts,
            max_actions: 1000,
            max_size_bytes: 5 * MB,
            flush_interval: None,
            backoff: None,
            flush_on_checkpoint: true,
        }
    }

    /// Read the sink keys from a property map, each key prefixed with `prefix`
    pub fn from_properties(
        props: &BTreeMap<String, String>,
        prefix: &str,
    ) -> Result<Self, SinkConfigError> {
        let get = |key: &str| {
            props
                .get(&format!("{}{}", prefix, key))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let hosts: Vec<String> = get(HOST)
            .ok_or_else(|| SinkConfigError::Missing(format!("{}{}", prefix, HOST)))?
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(normalize_host)
            .collect();
        if hosts.is_empty() {
            return Err(SinkConfigError::Missing(format!("{}{}", prefix, HOST)));
        }

        let mut config = Self::new(hosts);
        if let Some(v) = get(MAX_ACTIONS) {
            config.max_actions = parse_positive(prefix, MAX_ACTIONS, v)? as usize;
        }
        if let Some(v) = get(MAX_SIZE_MB) {
            config.max_size_bytes = parse_positive(prefix, MAX_SIZE_MB, v)? as usize * MB;
        }
        if let Some(v) = get(INTERVAL) {
            config.flush_interval = Some(Duration::from_millis(parse_positive(prefix, INTERVAL, v)?));
        }
        if let Some(v) = get(FLUSH_ON_CHECKPOINT_DISABLE) {
            config.flush_on_checkpoint = !parse_bool(prefix, FLUSH_ON_CHECKPOINT_DISABLE, v)?;
        }

        let backoff_enabled = match get(BACKOFF_ENABLE) {
            Some(v) => parse_bool(prefix, BACKOFF_ENABLE, v)?,
            None => false,
        };
        if backoff_enabled {
            let kind = match get(BACKOFF_TYPE) {
                Some(v) => v.parse().map_err(|_| SinkConfigError::InvalidValue {
                    key: format!("{}{}", prefix, BACKOFF_TYPE),
                    value: v.to_string(),
                    expected: "CONSTANT or EXPONENTIAL",
                })?,
                None => BackoffType::Constant,
            };
            let retries = match get(BACKOFF_RETRIES) {
                Some(v) => u32::try_from(parse_positive(prefix, BACKOFF_RETRIES, v)?).map_err(|_| {
                    SinkConfigError::InvalidValue {
                        key: format!("{}{}", prefix, BACKOFF_RETRIES),
                        value: v.to_string(),
                        expected: "a retry count",
                    }
                })?,
                None => 3,
            };
            let delay = match get(BACKOFF_DELAY) {
                Some(v) => Duration::from_millis(parse_u64(prefix, BACKOFF_DELAY, v)?),
                None => Duration::from_millis(50),
            };
            config.backoff = Some(BackoffPolicy {
                kind,
                retries,
                delay,
            });
        }

        Ok(config)
    }
}

fn normalize_host(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

fn parse_u64(prefix: &str, key: &str, value: &str) -> Result<u64, SinkConfigError> {
    value.parse().map_err(|_| SinkConfigError::InvalidValue {
        key: format!("{}{}", prefix, key),
        value: value.to_string(),
        expected: "an unsigned integer",
    })
}

fn parse_positive(prefix: &str, key: &str, value: &str) -> Result<u64, SinkConfigError> {
    match parse_u64(prefix, key, value)? {
        0 => Err(SinkConfigError::InvalidValue {
            key: format!("{}{}", prefix, key),
            value: value.to_string(),
            expected: "a positive integer",
        }),
        n => Ok(n),
    }
}

fn parse_bool(prefix: &str, key: &str, value: &str) -> Result<bool, SinkConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SinkConfigError::InvalidValue {
            key: format!("{}{}", prefix, key),
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}
