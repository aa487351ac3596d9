//! Multi-subscriber event fan-out.
//!
//! Cluster state changes, offline transitions, permission results and
//! forward-list updates all use the same primitive: an observer list with
//! synchronous dispatch. Multiple independent consumers can attach without
//! displacing each other, and each subscription is released through its
//! [`Disposable`] handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// A handle whose `dispose()` releases the resource it represents
/// (a subscription, a live tunnel, a batch of sessions) exactly once.
pub trait Disposable: Send {
    /// Releases the underlying resource. Subsequent calls are no-ops.
    fn dispose(&mut self);
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerList<T> = Arc<RwLock<Vec<(u64, Listener<T>)>>>;

/// A multi-subscriber event channel with synchronous fan-out.
pub struct EventEmitter<T: 'static> {
    listeners: ListenerList<T>,
    next_id: AtomicU64,
}

impl<T: 'static> EventEmitter<T> {
    /// Creates an emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a listener. The returned subscription removes it on dispose.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
            disposed: false,
        }
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// The listener list is snapshotted before dispatch, so a listener may
    /// subscribe or dispose subscriptions from within its callback.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registered listener.
///
/// Holds only a weak reference to the emitter, so an outstanding
/// subscription never keeps a dropped emitter alive.
pub struct Subscription<T: 'static> {
    id: u64,
    listeners: Weak<RwLock<Vec<(u64, Listener<T>)>>>,
    disposed: bool,
}

impl<T: 'static> Disposable for Subscription<T> {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}
