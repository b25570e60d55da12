//! REST backend tests
//!
//! The real factories, descriptors and clients, wired to a `MockTransport`
//! that plays the ResourceManager and the JobManager REST API.

mod fixtures;

use std::collections::BTreeMap;
use std::sync::Arc;

use cluster_lane::rest::{
    DirectSessionFactory, HttpResponse, Method, MockTransport, Transport, YarnSessionFactory,
};
use cluster_lane::{
    ClusterLane, EffectiveConfig, ErrorCode, ExecutionMode, FactoryRegistry, JarGraphBuilder,
    StopRequest, SubmitRequest,
};
use serde_json::json;
use tempfile::NamedTempFile;

use fixtures::{APP_ID, JOB_ID};

const PROXY: &str = "/proxy/application_123_0001";

fn rest_lane(transport: &Arc<MockTransport>) -> ClusterLane {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    let mut registry = FactoryRegistry::new();
    registry
        .register(Arc::new(DirectSessionFactory::remote().with_transport(Arc::clone(&transport))))
        .register(Arc::new(YarnSessionFactory::new().with_transport(transport)));

    let overrides: BTreeMap<String, String> = [
        ("yarn.resourcemanager.webapp.address", "http://rm:8088"),
        ("savepoint.poll.interval", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let config = EffectiveConfig::build(None, None, overrides).unwrap();

    ClusterLane::new(config, registry, Arc::new(JarGraphBuilder::new()))
}

fn jar() -> NamedTempFile {
    tempfile::Builder::new().suffix(".jar").tempfile().unwrap()
}

fn running_session(transport: &MockTransport) {
    transport.on(
        Method::Get,
        "/ws/v1/cluster/apps/application_123_0001",
        HttpResponse::json_body(
            200,
            json!({"app": {"state": "RUNNING", "trackingUrl": "http://rm:8088/proxy/application_123_0001/"}}),
        ),
    );
}

#[test]
fn test_yarn_session_submit() {
    let transport = Arc::new(MockTransport::new());
    running_session(&transport);
    transport
        .on(
            Method::Post,
            &format!("{}/jars/upload", PROXY),
            HttpResponse::json_body(200, json!({"filename": "/tmp/web/upload/u1_job.jar", "status": "success"})),
        )
        .on(
            Method::Post,
            &format!("{}/jars/u1_job.jar/run", PROXY),
            HttpResponse::json_body(200, json!({"jobid": JOB_ID})),
        )
        .on(
            Method::Delete,
            &format!("{}/jars/u1_job.jar", PROXY),
            HttpResponse::new(200, "{}"),
        );
    let lane = rest_lane(&transport);
    let artifact = jar();
    let request = SubmitRequest::new(ExecutionMode::YarnSession, artifact.path())
        .with_cluster_id(APP_ID)
        .with_entry_class("org.example.WordCount")
        .with_parallelism(2);

    let response = lane.submit(&request).unwrap();

    assert_eq!(response.cluster_id.as_str(), APP_ID);
    assert_eq!(response.job_id.as_str(), JOB_ID);

    let run = transport.requests_to(Method::Post, &format!("{}/jars/u1_job.jar/run", PROXY));
    assert_eq!(run.len(), 1);
    assert_eq!(transport.requests_to(Method::Delete, &format!("{}/jars/u1_job.jar", PROXY)).len(), 1);
}

#[test]
fn test_yarn_session_stop_with_savepoint() {
    let transport = Arc::new(MockTransport::new());
    running_session(&transport);
    let status = format!("{}/jobs/{}/savepoints/t-1", PROXY, JOB_ID);
    transport
        .on(
            Method::Post,
            &format!("{}/jobs/{}/savepoints", PROXY, JOB_ID),
            HttpResponse::json_body(202, json!({"request-id": "t-1"})),
        )
        .on(
            Method::Get,
            &status,
            HttpResponse::json_body(200, json!({"status": {"id": "IN_PROGRESS"}})),
        )
        .on(
            Method::Get,
            &status,
            HttpResponse::json_body(
                200,
                json!({"status": {"id": "COMPLETED"}, "operation": {"location": "/tmp/sp-1"}}),
            ),
        );
    let lane = rest_lane(&transport);
    let request = StopRequest::new(JOB_ID, ExecutionMode::YarnSession)
        .with_cluster_id(APP_ID)
        .with_savepoint(None);

    let response = lane.stop(&request).unwrap();

    assert_eq!(response.ack, "savepoint:/tmp/sp-1");
    assert_eq!(transport.requests_to(Method::Get, &status).len(), 2);
}

#[test]
fn test_finished_application_is_connection_error() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::Get,
        "/ws/v1/cluster/apps/application_123_0001",
        HttpResponse::json_body(200, json!({"app": {"state": "FINISHED"}})),
    );
    let lane = rest_lane(&transport);
    let request = StopRequest::new(JOB_ID, ExecutionMode::YarnSession).with_cluster_id(APP_ID);

    let err = lane.stop(&request).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ClusterConnectionError);
}

#[test]
fn test_malformed_application_id_makes_no_requests() {
    let transport = Arc::new(MockTransport::new());
    let lane = rest_lane(&transport);
    let request = StopRequest::new(JOB_ID, ExecutionMode::YarnSession).with_cluster_id("app-123");

    let err = lane.stop(&request).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ConfigurationError);
    assert!(transport.requests().is_empty());
}

#[test]
fn test_remote_plain_cancel() {
    let transport = Arc::new(MockTransport::new());
    transport
        .on(Method::Get, "/overview", HttpResponse::json_body(200, json!({"taskmanagers": 1})))
        .on(
            Method::Patch,
            &format!("/jobs/{}?mode=cancel", JOB_ID),
            HttpResponse::new(202, ""),
        );
    let lane = rest_lane(&transport);
    let request = StopRequest::new(JOB_ID, ExecutionMode::Remote).with_cluster_id("jm.internal:8081");

    let response = lane.stop(&request).unwrap();

    assert_eq!(response.ack, "");
    let cancel = transport.requests_to(Method::Patch, &format!("/jobs/{}?mode=cancel", JOB_ID));
    assert_eq!(cancel.len(), 1);
    assert!(cancel[0].url.starts_with("http://jm.internal:8081/"));
}

#[test]
fn test_remote_unreachable() {
    let transport = Arc::new(MockTransport::new());
    transport.set_unreachable(true);
    let lane = rest_lane(&transport);
    let request = StopRequest::new(JOB_ID, ExecutionMode::Remote).with_cluster_id("jm.internal:8081");

    let err = lane.stop(&request).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ClusterConnectionError);
}

#[test]
fn test_missing_jar_is_job_graph_error() {
    let transport = Arc::new(MockTransport::new());
    running_session(&transport);
    let lane = rest_lane(&transport);
    let request = SubmitRequest::new(ExecutionMode::YarnSession, "/nonexistent/job.jar")
        .with_cluster_id(APP_ID);

    let err = lane.submit(&request).unwrap_err();

    assert_eq!(err.code(), ErrorCode::JobGraphError);
    assert!(transport.requests().is_empty());
}

#[test]
fn test_dedicated_target_has_no_default_factory() {
    let lane = ClusterLane::with_defaults(fixtures::defaults());
    let request = SubmitRequest::new(ExecutionMode::YarnApplication, "job.jar");

    let err = lane.submit(&request).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ClusterResolutionError);
}
