//! Operation request/response types.

pub mod stop;
pub mod submit;

pub use stop::{StopRequest, StopResponse};
pub use submit::{SavepointRestore, SubmitRequest, SubmitResponse};
