//! Fetch concurrency limiting.

mod concurrency;

pub use concurrency::ConcurrencyLimiter;
