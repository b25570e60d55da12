//! REST-backed cluster collaborators
//!
//! Sessions are reached over HTTP: the ResourceManager web services for
//! YARN, the JobManager REST API for everything else.

mod client;
mod direct;
pub mod transport;
mod yarn;

pub use client::{RestClientConfig, RestClusterClient};
pub use direct::{DirectDescriptor, DirectSessionFactory};
pub use transport::{Body, HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, Transport, TransportError};
pub use yarn::{is_application_id, YarnSessionDescriptor, YarnSessionFactory};
