//! Error types for Invasion.

use thiserror::Error;

/// Top-level error type for loading and validating Invasion data.
#[derive(Debug, Error)]
pub enum InvasionError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration value is unusable even after clamping
    #[error("Invalid config field `{field}`: {reason}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Invasion operations.
pub type InvasionResult<T> = Result<T, InvasionError>;
