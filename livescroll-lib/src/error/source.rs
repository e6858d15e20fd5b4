//! Data source error types

use std::time::Duration;

/// Errors a [`DataSource`](crate::source::DataSource) can report for a page request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The backing store could not be reached.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The request timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The requested page cannot be served.
    #[error("Invalid page {index}: {message}")]
    InvalidPage {
        /// The page index that was requested.
        index: usize,
        /// Why the page was rejected.
        message: String,
    },

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Creates a new unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a new invalid page error.
    pub fn invalid_page(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidPage {
            index,
            message: message.into(),
        }
    }

    /// Returns the page index if the error names one.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            Self::InvalidPage { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Returns `true` if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
