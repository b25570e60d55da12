//! Session clusters reached directly through their REST endpoint
//!
//! `remote` addresses a standalone cluster as `host:port`. `kubernetes-session`
//! addresses a session cluster by id through its in-cluster REST service.

use lane_protocol::{ClusterId, ExecutionMode};
use log::debug;
use std::sync::Arc;

use super::client::{rejection, RestClientConfig, RestClusterClient};
use super::transport::{HttpRequest, HttpTransport, Transport};
use crate::cluster::{native_cluster_id, ClientFactory, ClusterClient, ClusterDescriptor};
use crate::config::{options, Configuration};
use crate::error::ClusterError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    /// Cluster id is the `host:port` (or full URL) of the cluster
    Address,
    /// `http://{id}-rest.{namespace}:{port}`
    KubernetesService { namespace: String, port: u16 },
}

/// Factory for `remote` and `kubernetes-session`
pub struct DirectSessionFactory {
    mode: ExecutionMode,
    transport: Option<Arc<dyn Transport>>,
}

impl DirectSessionFactory {
    pub fn remote() -> Self {
        Self {
            mode: ExecutionMode::Remote,
            transport: None,
        }
    }

    pub fn kubernetes_session() -> Self {
        Self {
            mode: ExecutionMode::KubernetesSession,
            transport: None,
        }
    }

    /// Use `transport` instead of building an HTTP transport per descriptor
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl ClientFactory for DirectSessionFactory {
    fn target(&self) -> &str {
        self.mode.target_name()
    }

    fn cluster_id(&self, config: &Configuration) -> Result<Option<ClusterId>, ClusterError> {
        native_cluster_id(config)
    }

    fn create_descriptor(&self, config: &Configuration) -> Result<Box<dyn ClusterDescriptor>, ClusterError> {
        let endpoint = match self.mode {
            ExecutionMode::KubernetesSession => Endpoint::KubernetesService {
                namespace: config
                    .get(options::KUBERNETES_NAMESPACE)
                    .unwrap_or("default")
                    .to_string(),
                port: config
                    .get_u16(options::REST_PORT)
                    .map_err(|e| ClusterError::Protocol(e.to_string()))?
                    .unwrap_or(8081),
            },
            _ => Endpoint::Address,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(ref transport) => Arc::clone(transport),
            None => {
                let timeout = config
                    .client_timeout()
                    .map_err(|e| ClusterError::Protocol(e.to_string()))?;
                Arc::new(HttpTransport::new(timeout)?)
            }
        };
        let client_config = RestClientConfig::from_configuration(config)
            .map_err(|e| ClusterError::Protocol(e.to_string()))?;

        Ok(Box::new(DirectDescriptor {
            endpoint,
            transport,
            client_config,
            closed: false,
        }))
    }
}

/// Descriptor for a directly reachable session cluster
pub struct DirectDescriptor {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    client_config: RestClientConfig,
    closed: bool,
}

impl DirectDescriptor {
    fn base_url(&self, cluster_id: &ClusterId) -> String {
        match self.endpoint {
            Endpoint::Address => {
                let id = cluster_id.as_str();
                if id.starts_with("http://") || id.starts_with("https://") {
                    id.to_string()
                } else {
                    format!("http://{}", id)
                }
            }
            Endpoint::KubernetesService {
                ref namespace,
                port,
            } => format!("http://{}-rest.{}:{}", cluster_id, namespace, port),
        }
    }
}

impl ClusterDescriptor for DirectDescriptor {
    fn retrieve(&self, cluster_id: &ClusterId) -> Result<Box<dyn ClusterClient>, ClusterError> {
        if self.closed {
            return Err(ClusterError::Protocol("descriptor is closed".to_string()));
        }
        let base_url = self.base_url(cluster_id);
        let request = HttpRequest::get(format!("{}/overview", base_url.trim_end_matches('/')));
        let response = self.transport.execute(&request).map_err(|e| {
            ClusterError::Unreachable(format!("{} ({})", base_url, e))
        })?;
        if !response.is_success() {
            return Err(rejection(&request, &response));
        }
        debug!("connected to {} at {}", cluster_id, base_url);

        Ok(Box::new(RestClusterClient::new(
            cluster_id.clone(),
            base_url,
            Arc::clone(&self.transport),
            self.client_config.clone(),
        )))
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.closed = true;
        Ok(())
    }
}
