//! Error types for the analysis engine.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for keyword and monitoring operations
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected during validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding provider failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Completion provider failure
    #[error("LLM error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Data source failure during ingestion
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Not enough observations for a statistical operation
    #[error("Insufficient data: need {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Pipeline stage exceeded the execution budget
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Repository or store misuse
    #[error("Storage error: {0}")]
    Storage(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to an HTTP status code
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 422,
            Error::NotFound(_) => 404,
            Error::Timeout(_) => 500,
            Error::InsufficientData { .. } => 422,
            _ => 500,
        }
    }

    /// Checks whether the error is worth retrying at a provider seam
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }
}
