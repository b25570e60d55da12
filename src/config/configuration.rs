//! The native configuration bag

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::options;

/// Flat key/value configuration handed to the cluster-side collaborators.
///
/// Coordinators take it by value, so every invocation owns its copy and
/// translation never touches a value other calls can see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    entries: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Raw value for a key. Blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Builder-style `set`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.get(key)
            .map(|v| {
                v.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: v.to_string(),
                    expected: "an unsigned integer",
                })
            })
            .transpose()
    }

    pub fn get_u16(&self, key: &str) -> Result<Option<u16>, ConfigError> {
        self.get(key)
            .map(|v| {
                v.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: v.to_string(),
                    expected: "a port number",
                })
            })
            .transpose()
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: v.to_string(),
                    expected: "a boolean",
                }),
            })
            .transpose()
    }

    /// Remote call timeout (`client.timeout`, seconds)
    pub fn client_timeout(&self) -> Result<Duration, ConfigError> {
        let secs = self.get_u64(options::CLIENT_TIMEOUT)?.unwrap_or(60);
        Ok(Duration::from_secs(secs))
    }

    /// Copy of all entries
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.clone()
    }

    /// Copy of all entries with secret values masked
    pub fn redacted(&self) -> (BTreeMap<String, String>, Vec<String>) {
        let mut redactions = Vec::new();
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| {
                if options::is_secret(k) {
                    redactions.push(k.clone());
                    (k.clone(), "[REDACTED]".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();
        (entries, redactions)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}
