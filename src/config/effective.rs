//! Effective configuration with provenance
//!
//! The effective configuration captures the merged native configuration
//! plus where each contributing layer came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::configuration::{ConfigError, Configuration};
use super::defaults::BuiltinDefaults;
use super::merge::{flatten_toml, merge_layers};
use super::options;

/// Environment variable naming the host config file
pub const CONFIG_ENV: &str = "CLUSTER_LANE_CONF";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged native configuration
    pub configuration: Configuration,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        host_config_path: Option<&Path>,
        config_path: Option<&Path>,
        cli_overrides: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_layer());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Host config, skipped when absent
        if let Some(path) = host_config_path {
            if path.exists() {
                let (layer, digest) = Self::load_toml_file(path)?;
                layers.push(layer);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Explicit config file, which must exist
        if let Some(path) = config_path {
            let (layer, digest) = Self::load_toml_file(path)?;
            layers.push(layer);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        // Layer 4: CLI overrides
        if !cli_overrides.is_empty() {
            layers.push(cli_overrides);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let configuration = Configuration::from_map(merge_layers(layers));
        Self::validate_config(&configuration)?;

        Ok(Self {
            created_at: Utc::now(),
            configuration,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the flattened layer and digest
    fn load_toml_file(path: &Path) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((flatten_toml(&value), digest))
    }

    /// Validate configuration values
    fn validate_config(config: &Configuration) -> Result<(), ConfigError> {
        // client.timeout must be in (0, 3600]
        if let Some(timeout) = config.get_u64(options::CLIENT_TIMEOUT)? {
            if timeout == 0 || timeout > 3600 {
                return Err(ConfigError::ValidationError(
                    "client.timeout must be in (0, 3600]".to_string(),
                ));
            }
        }

        if let Some(attempts) = config.get_u64(options::SAVEPOINT_POLL_MAX_ATTEMPTS)? {
            if attempts == 0 {
                return Err(ConfigError::ValidationError(
                    "savepoint.poll.max-attempts must be positive".to_string(),
                ));
            }
        }

        config.get_u16(options::REST_PORT)?;
        config.get_u64(options::SAVEPOINT_POLL_INTERVAL)?;

        Ok(())
    }

    /// A fresh copy of the native configuration for one invocation
    pub fn native(&self) -> Configuration {
        self.configuration.clone()
    }

    /// Serialize to JSON with secrets masked
    pub fn to_redacted_json(&self) -> Result<String, serde_json::Error> {
        let (entries, redactions) = self.configuration.redacted();
        serde_json::to_string_pretty(&serde_json::json!({
            "created_at": self.created_at,
            "configuration": entries,
            "sources": self.sources,
            "redactions": redactions,
        }))
    }
}

/// Default host config location
pub fn default_host_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/cluster-lane/config.toml"))
}

/// Parse a `key=value` override
pub fn parse_override(raw: &str) -> Result<(String, String), ConfigError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::ParseError(format!("expected key=value, got '{}'", raw)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::ParseError(format!("empty key in '{}'", raw)));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
