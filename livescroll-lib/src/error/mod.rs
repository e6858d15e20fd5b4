//! Error types

mod config;
mod source;

pub use config::*;
pub use source::*;

/// Top-level error for grid operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A page fetch failed at the data source.
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// Grid configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation that needs an initialized coordinator ran before `initialize`.
    #[error("Paging coordinator is not initialized")]
    NotInitialized,

    /// The fetch concurrency limiter was closed.
    #[error("Fetch limiter closed")]
    LimiterClosed,
}

impl Error {
    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_retryable(),
            _ => false,
        }
    }
}
