//! YARN session clusters
//!
//! The session is addressed by its YARN application id. Retrieval asks the
//! ResourceManager for the application and connects to its tracking URL.

use lane_protocol::{ClusterId, ExecutionMode};
use log::debug;
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use super::client::{rejection, RestClientConfig, RestClusterClient};
use super::transport::{HttpRequest, HttpTransport, Transport};
use crate::cluster::{ClientFactory, ClusterClient, ClusterDescriptor};
use crate::config::{options, Configuration};
use crate::error::ClusterError;

fn application_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^application_\d+_\d+$").expect("valid application id pattern"))
}

/// Whether `id` looks like a YARN application id
pub fn is_application_id(id: &str) -> bool {
    application_id_pattern().is_match(id)
}

#[derive(Debug, Deserialize)]
struct AppEnvelope {
    app: AppReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppReport {
    state: String,
    #[serde(default)]
    tracking_url: Option<String>,
}

/// Factory for `yarn-session`
#[derive(Default)]
pub struct YarnSessionFactory {
    transport: Option<Arc<dyn Transport>>,
}

impl YarnSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `transport` instead of building an HTTP transport per descriptor
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl ClientFactory for YarnSessionFactory {
    fn target(&self) -> &str {
        ExecutionMode::YarnSession.target_name()
    }

    /// Malformed application ids yield no cluster id
    fn cluster_id(&self, config: &Configuration) -> Result<Option<ClusterId>, ClusterError> {
        let Some(id) = config.get(options::YARN_APPLICATION_ID) else {
            return Ok(None);
        };
        if !is_application_id(id) {
            debug!("ignoring malformed {} '{}'", options::YARN_APPLICATION_ID, id);
            return Ok(None);
        }
        Ok(ClusterId::new(id))
    }

    fn create_descriptor(&self, config: &Configuration) -> Result<Box<dyn ClusterDescriptor>, ClusterError> {
        let rm_address = config
            .get(options::YARN_RM_WEBAPP_ADDRESS)
            .unwrap_or("http://localhost:8088")
            .trim_end_matches('/')
            .to_string();
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

        Ok(Box::new(YarnSessionDescriptor {
            rm_address,
            transport,
            client_config,
            closed: false,
        }))
    }
}

/// Descriptor for a running YARN session
pub struct YarnSessionDescriptor {
    rm_address: String,
    transport: Arc<dyn Transport>,
    client_config: RestClientConfig,
    closed: bool,
}

impl ClusterDescriptor for YarnSessionDescriptor {
    fn retrieve(&self, cluster_id: &ClusterId) -> Result<Box<dyn ClusterClient>, ClusterError> {
        if self.closed {
            return Err(ClusterError::Protocol("descriptor is closed".to_string()));
        }
        let request = HttpRequest::get(format!(
            "{}/ws/v1/cluster/apps/{}",
            self.rm_address, cluster_id
        ));
        let response = self.transport.execute(&request).map_err(|e| {
            ClusterError::Unreachable(format!("ResourceManager {} ({})", self.rm_address, e))
        })?;
        if !response.is_success() {
            return Err(rejection(&request, &response));
        }

        let report = response.json::<AppEnvelope>()?.app;
        if report.state != "RUNNING" {
            return Err(ClusterError::Unreachable(format!(
                "application {} is {}",
                cluster_id, report.state
            )));
        }
        let tracking_url = report
            .tracking_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ClusterError::Protocol(format!("application {} has no tracking URL", cluster_id))
            })?;
        debug!("session {} tracked at {}", cluster_id, tracking_url);

        Ok(Box::new(RestClusterClient::new(
            cluster_id.clone(),
            tracking_url,
            Arc::clone(&self.transport),
            self.client_config.clone(),
        )))
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::transport::{HttpResponse, Method, MockTransport};
    use serde_json::json;

    const APP: &str = "application_123_0001";

    fn config() -> Configuration {
        Configuration::new()
            .with(options::EXECUTION_TARGET, "yarn-session")
            .with(options::YARN_APPLICATION_ID, APP)
            .with(options::YARN_RM_WEBAPP_ADDRESS, "http://rm:8088/")
    }

    #[test]
    fn test_application_id_pattern() {
        assert!(is_application_id("application_123_0001"));
        assert!(!is_application_id("application_123"));
        assert!(!is_application_id("app_1_2"));
        assert!(!is_application_id("application_1_2 "));
    }

    #[test]
    fn test_malformed_id_yields_none() {
        let factory = YarnSessionFactory::new();
        let config = config().with(options::YARN_APPLICATION_ID, "not-an-app");
        assert!(factory.cluster_id(&config).unwrap().is_none());
        assert_eq!(
            factory.cluster_id(&self::config()).unwrap().unwrap().as_str(),
            APP
        );
    }

    #[test]
    fn test_retrieve_running_session() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::Get,
            "/ws/v1/cluster/apps/application_123_0001",
            HttpResponse::json_body(
                200,
                json!({"app": {"state": "RUNNING", "trackingUrl": "http://rm:8088/proxy/application_123_0001/"}}),
            ),
        );
        let factory = YarnSessionFactory::new().with_transport(transport.clone());
        let descriptor = factory.create_descriptor(&config()).unwrap();

        let client = descriptor.retrieve(&ClusterId::new(APP).unwrap()).unwrap();
        assert_eq!(client.cluster_id().as_str(), APP);
        assert_eq!(
            transport.requests()[0].url,
            "http://rm:8088/ws/v1/cluster/apps/application_123_0001"
        );
    }

    #[test]
    fn test_retrieve_finished_session() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::Get,
            "/ws/v1/cluster/apps/application_123_0001",
            HttpResponse::json_body(200, json!({"app": {"state": "FINISHED"}})),
        );
        let factory = YarnSessionFactory::new().with_transport(transport);
        let descriptor = factory.create_descriptor(&config()).unwrap();

        let err = descriptor.retrieve(&ClusterId::new(APP).unwrap()).err().unwrap();
        assert!(err.to_string().contains("FINISHED"));
    }

    #[test]
    fn test_retrieve_unknown_application() {
        let transport = Arc::new(MockTransport::new());
        let factory = YarnSessionFactory::new().with_transport(transport);
        let descriptor = factory.create_descriptor(&config()).unwrap();

        let err = descriptor.retrieve(&ClusterId::new(APP).unwrap()).err().unwrap();
        assert!(matches!(err, ClusterError::NotFound(_)));
    }
}
