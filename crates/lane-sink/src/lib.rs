//! Lane Sink
//!
//! Batches application records into write actions against a search
//! backend. The backend itself stays behind the `BulkClient` trait.

pub mod action;
pub mod config;
pub mod error;
pub mod processor;
pub mod sink;

pub use action::{bulk_body, WriteAction};
pub use config::{BackoffPolicy, BackoffType, SinkConfig};
pub use error::{SinkConfigError, SinkError};
pub use processor::{
    BulkClient, BulkProcessor, FailOnError, FailureHandler, IgnoreFailures, ItemOutcome,
    ProcessorStats, RetryRejected,
};
pub use sink::ElasticsearchSink;
