//! Native configuration keys

/// Deployment target name (`yarn-session`, `remote`, ...)
pub const EXECUTION_TARGET: &str = "execution.target";

/// YARN application id of a running session cluster
pub const YARN_APPLICATION_ID: &str = "yarn.application.id";

/// ResourceManager web address used to look up applications
pub const YARN_RM_WEBAPP_ADDRESS: &str = "yarn.resourcemanager.webapp.address";

/// Kubernetes session cluster id
pub const KUBERNETES_CLUSTER_ID: &str = "kubernetes.cluster-id";

/// Namespace of the Kubernetes session cluster
pub const KUBERNETES_NAMESPACE: &str = "kubernetes.namespace";

/// JobManager REST host
pub const REST_ADDRESS: &str = "rest.address";

/// JobManager REST port
pub const REST_PORT: &str = "rest.port";

/// Transport timeout in seconds for every remote call
pub const CLIENT_TIMEOUT: &str = "client.timeout";

/// Delay between savepoint status polls, in milliseconds
pub const SAVEPOINT_POLL_INTERVAL: &str = "savepoint.poll.interval";

/// Maximum number of savepoint status polls
pub const SAVEPOINT_POLL_MAX_ATTEMPTS: &str = "savepoint.poll.max-attempts";

/// Job name recorded with the submission
pub const PIPELINE_NAME: &str = "pipeline.name";

/// Default parallelism
pub const PARALLELISM_DEFAULT: &str = "parallelism.default";

/// Savepoint to restore from
pub const SAVEPOINT_PATH: &str = "execution.savepoint.path";

/// Allow skipping state that cannot be restored
pub const SAVEPOINT_IGNORE_UNCLAIMED: &str = "execution.savepoint.ignore-unclaimed-state";

/// Key fragments whose values are masked when configuration is displayed
pub const SECRET_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "credential",
];

/// Whether values of this key must be masked for display
pub fn is_secret(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_secret() {
        assert!(is_secret("security.ssl.keystore-password"));
        assert!(is_secret("auth.TOKEN"));
        assert!(!is_secret(YARN_APPLICATION_ID));
    }
}
