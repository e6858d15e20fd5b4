//! Row lifecycle and interaction events.
//!
//! # Architecture
//!
//! Every signal is an [`Emitter<T>`]: a typed publish/subscribe channel whose
//! subscribers are held weakly and released by dropping the returned
//! [`Subscription`] guard. [`GridEvents`] bundles the five channels the grid
//! core produces (select, row-create, row-destroy, click, double-click).
//!
//! The coordinator and the grid emit on an internal `GridEvents`; an
//! [`EventBroadcaster`] forwards each of them unchanged to a second,
//! host-facing `GridEvents` and owns the five forwarding subscriptions, so
//! they are released together on teardown.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A dropped `Subscription` is never called again.
//! 3. Callbacks run with no emitter lock held, so a subscriber may subscribe,
//!    unsubscribe or emit from inside its callback.

use std::any::Any;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use crate::model::Row;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type WeakCallback<T> = Weak<dyn Fn(&T) + Send + Sync>;

/// A typed publish/subscribe channel.
///
/// Cloning an `Emitter` creates a new handle to the same subscriber list.
pub struct Emitter<T> {
    subscribers: Arc<Mutex<Vec<WeakCallback<T>>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: 'static> Emitter<T> {
    /// Create an emitter with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered until the returned guard is
    /// dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let strong: Callback<T> = Arc::new(callback);
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `value` to every live subscriber.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(|w| w.upgrade()).collect()
        };

        for cb in &callbacks {
            cb(value);
        }
    }
}

impl<T> Emitter<T> {
    /// Number of registered subscribers, including dropped ones not yet
    /// pruned by an `emit`.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it makes the callback unreachable for the emitter.
pub struct Subscription {
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    /// Explicitly unsubscribe. Same as dropping the guard.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// =============================================================================
// Event payloads
// =============================================================================

/// Payload of row-create and row-destroy events.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvent {
    /// The row entering or leaving the resident window.
    pub row: Row,
    /// Index of the page holding the row.
    pub page: usize,
}

/// Keyboard modifiers held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl (or Cmd) held.
    pub ctrl: bool,
    /// Shift held.
    pub shift: bool,
}

/// Payload of click events.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    /// The clicked row.
    pub row: Row,
    /// Index of the page holding the row.
    pub page: usize,
    /// Modifiers held during the click.
    pub modifiers: Modifiers,
}

/// The five event channels of a grid.
#[derive(Debug, Clone, Default)]
pub struct GridEvents {
    /// Batched selection: every selected resident row, in row order.
    pub select: Emitter<Vec<Row>>,
    /// A row entered a resident page.
    pub row_create: Emitter<RowEvent>,
    /// A row left a resident page.
    pub row_destroy: Emitter<RowEvent>,
    /// A row was clicked.
    pub click: Emitter<ClickEvent>,
    /// A row was double-clicked.
    pub double_click: Emitter<Row>,
}

impl GridEvents {
    /// Create a set of channels with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// Broadcaster
// =============================================================================

/// Forwards the internal grid events to host subscribers.
///
/// Payloads pass through untouched. All five forwarding subscriptions live
/// and die together.
#[derive(Debug)]
pub struct EventBroadcaster {
    outputs: GridEvents,
    teardowns: Vec<Subscription>,
}

impl EventBroadcaster {
    /// Start forwarding everything `source` emits.
    pub fn attach(source: &GridEvents) -> Self {
        let outputs = GridEvents::new();
        let teardowns = vec![
            forward(&source.select, &outputs.select),
            forward(&source.row_create, &outputs.row_create),
            forward(&source.row_destroy, &outputs.row_destroy),
            forward(&source.double_click, &outputs.double_click),
            forward(&source.click, &outputs.click),
        ];
        Self { outputs, teardowns }
    }

    /// The host-facing channels.
    pub fn outputs(&self) -> &GridEvents {
        &self.outputs
    }

    /// Returns `true` until [`teardown`](Self::teardown) runs.
    pub fn is_attached(&self) -> bool {
        !self.teardowns.is_empty()
    }

    /// Release every forwarding subscription at once.
    pub fn teardown(&mut self) {
        self.teardowns.clear();
    }
}

fn forward<T: 'static>(from: &Emitter<T>, to: &Emitter<T>) -> Subscription {
    let to = to.clone();
    from.subscribe(move |evt| to.emit(evt))
}
