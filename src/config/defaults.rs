//! Built-in lane defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::options;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// JobManager REST port (default: 8081)
    pub rest_port: u16,

    /// Remote call timeout in seconds (default: 60)
    pub client_timeout_seconds: u64,

    /// ResourceManager web address (default: http://localhost:8088)
    pub yarn_rm_webapp_address: String,

    /// Kubernetes namespace (default: "default")
    pub kubernetes_namespace: String,

    /// Delay between savepoint polls in milliseconds (default: 500)
    pub savepoint_poll_interval_ms: u64,

    /// Savepoint poll attempts before giving up (default: 600)
    pub savepoint_poll_max_attempts: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            rest_port: 8081,
            client_timeout_seconds: 60,
            yarn_rm_webapp_address: "http://localhost:8088".to_string(),
            kubernetes_namespace: "default".to_string(),
            savepoint_poll_interval_ms: 500,
            savepoint_poll_max_attempts: 600,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a flat layer for merging
    pub fn to_layer(&self) -> BTreeMap<String, String> {
        [
            (options::REST_PORT, self.rest_port.to_string()),
            (options::CLIENT_TIMEOUT, self.client_timeout_seconds.to_string()),
            (options::YARN_RM_WEBAPP_ADDRESS, self.yarn_rm_webapp_address.clone()),
            (options::KUBERNETES_NAMESPACE, self.kubernetes_namespace.clone()),
            (options::SAVEPOINT_POLL_INTERVAL, self.savepoint_poll_interval_ms.to_string()),
            (options::SAVEPOINT_POLL_MAX_ATTEMPTS, self.savepoint_poll_max_attempts.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
