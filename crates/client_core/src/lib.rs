//! Session controller for the analysis workflow: file intake and validation,
//! the single-flight inference request, and the confidence-indexed result
//! store behind the results view. GUI-free; binaries layer presentation on
//! top of these contracts.

pub mod error;
pub mod intake;
pub mod orchestrator;
pub mod results;
pub mod session;
pub mod transport;

pub use error::{OrchestratorError, StoreError, ValidationError};
pub use session::Session;
pub use transport::{HttpInferenceClient, InferenceBackend};
