//! Scroll signal coalescing.
//!
//! Viewport scroll events arrive in bursts. The grid only reacts once the
//! viewport has been quiet for a while, and only if the settled window
//! differs from the last one it acted on.

use std::time::Duration;

use tokio::time::Instant;

/// Time-windowed coalescing filter with distinct-until-changed.
///
/// Every [`push`](Self::push) restarts the quiet period and replaces the
/// pending value. [`poll`](Self::poll) yields the pending value once its
/// deadline has passed, unless it equals the previously yielded one.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tokio::time::Instant;
/// use livescroll_lib::debounce::ScrollDebouncer;
///
/// let mut debouncer = ScrollDebouncer::new(Duration::from_millis(500));
/// let t0 = Instant::now();
/// debouncer.push(1, t0);
/// debouncer.push(2, t0 + Duration::from_millis(100));
/// assert_eq!(debouncer.poll(t0 + Duration::from_millis(300)), None);
/// assert_eq!(debouncer.poll(t0 + Duration::from_millis(600)), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct ScrollDebouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    last: Option<T>,
}

impl<T: Clone + PartialEq> ScrollDebouncer<T> {
    /// Creates a debouncer with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last: None,
        }
    }

    /// Returns the quiet period.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Records a new value observed at `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    /// When the pending value becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Yields the pending value if it is due and differs from the last one.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(at) if at <= now => self.flush(),
            _ => None,
        }
    }

    /// Yields the pending value immediately, still applying the distinct
    /// check.
    pub fn flush(&mut self) -> Option<T> {
        let (value, _) = self.pending.take()?;
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }

    /// Forgets both the pending and the last yielded value.
    pub fn reset(&mut self) {
        self.pending = None;
        self.last = None;
    }
}
