//! Error types for the adjustment engine

use thiserror::Error;

/// Result type alias for adjustment operations
pub type Result<T> = std::result::Result<T, AdjustmentError>;

/// Errors that can occur in the adjustment engine
///
/// Missing or partial window data is never an error; it is reported on the
/// result as a passthrough. Only broken configuration and unreadable inputs
/// surface here.
#[derive(Error, Debug)]
pub enum AdjustmentError {
    /// Weights, cap, aggressiveness or baseline out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An input document is missing required structure
    #[error("Malformed input in {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },

    /// Site name not recognised
    #[error("Unknown site: {0}")]
    UnknownSite(String),

    /// Role name not recognised
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse errors
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AdjustmentError {
    /// Create a new invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a new malformed input error
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
