//! Configuration error types

/// Errors raised while loading or validating a [`GridConfig`](crate::config::GridConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the grid cannot work with.
    #[error("{field}: {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Human-readable reason.
        message: String,
    },
}

impl ConfigError {
    /// Creates a new invalid field error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
