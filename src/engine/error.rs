//! Error types for engine operations

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised by the search engine or while talking to it
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be reached
    #[error("Engine connection failed: {0}")]
    Connection(String),

    /// Every attempt timed out
    #[error("Engine request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// The engine answered with a non-success status
    #[error("Engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The engine response was not the expected JSON
    #[error("Failed to decode engine response: {0}")]
    Decode(String),

    /// Invalid client configuration
    #[error("Invalid engine configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::Timeout { attempts: 1 }
        } else if err.is_decode() {
            EngineError::Decode(err.to_string())
        } else if err.is_builder() {
            EngineError::InvalidConfiguration(err.to_string())
        } else {
            EngineError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Decode(err.to_string())
    }
}
