//! Error types for the training pipeline

use thiserror::Error;

/// Crate-wide error type.
///
/// Lower-level errors wrap into one of these kinds at stage boundaries;
/// every failure is fatal to the run, there are no retryable errors.
#[derive(Debug, Error)]
pub enum NetGuardError {
    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document store fetch or connectivity failure
    #[error("document store error: {0}")]
    Store(String),

    /// Malformed or inconsistent tabular data
    #[error("data error: {0}")]
    Data(String),

    /// Schema file missing/malformed or a declared constraint violated
    #[error("schema violation: {0}")]
    Schema(String),

    /// Validation verdict was negative; the orchestrator aborts on this
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Blob, YAML or JSON round-trip failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Array dimensions do not line up
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Predict called before fit
    #[error("model is not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for NetGuardError {
    fn from(e: polars::error::PolarsError) -> Self {
        NetGuardError::Data(e.to_string())
    }
}

impl From<serde_json::Error> for NetGuardError {
    fn from(e: serde_json::Error) -> Self {
        NetGuardError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for NetGuardError {
    fn from(e: serde_yaml::Error) -> Self {
        NetGuardError::Serialization(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for NetGuardError {
    fn from(e: bincode::error::EncodeError) -> Self {
        NetGuardError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for NetGuardError {
    fn from(e: bincode::error::DecodeError) -> Self {
        NetGuardError::Serialization(e.to_string())
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, NetGuardError>;
