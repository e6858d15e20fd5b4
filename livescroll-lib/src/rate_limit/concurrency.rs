//! Concurrency limiting for simultaneous page fetches.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::sync::SemaphorePermit;

use crate::error::Error;

/// Limits the number of page fetches running against the data source at once.
///
/// Wraps a `tokio::sync::Semaphore`. A large scroll jump can put many pages
/// into the window at once; the limiter keeps the source from being hit with
/// all of them simultaneously.
///
/// # Example
///
/// ```
/// use livescroll_lib::rate_limit::ConcurrencyLimiter;
///
/// let limiter = ConcurrencyLimiter::new(10);
/// assert_eq!(limiter.limit(), 10);
/// assert_eq!(limiter.available(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Creates a new concurrency limiter with the specified limit.
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Acquires a permit, waiting if necessary.
    ///
    /// The permit is released when dropped.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, Error> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| Error::LimiterClosed)
    }

    /// Returns the configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of available permits.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(4)
    }
}
