#![forbid(unsafe_code)]

//! Broadcast streams with RAII subscriptions.
//!
//! A [`Stream<T>`] is a subscriber registry, not a value container: it
//! holds no current value and replays nothing. Emitting notifies every
//! live subscriber with a reference to the emitted value.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Dropping a [`Subscription`] removes the callback before the next
//!    emission.
//! 3. A subscriber registered during an emission does not observe that
//!    emission (the notify list is snapshotted first).
//! 4. Cloning a `Stream` clones the handle, not the registry; both
//!    handles address the same subscribers.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the emitter.
//! - Re-entrant emission from inside a callback: permitted; each
//!   emission snapshots its own notify list.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

/// A broadcast channel for change notifications.
///
/// Cheap to clone; all clones share one subscriber registry.
pub struct Stream<T> {
    subscribers: Rc<RefCell<Vec<Weak<dyn Fn(&T)>>>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<T: 'static> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: 'static> Stream<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a callback for future emissions.
    ///
    /// The callback stays live for as long as the returned
    /// [`Subscription`] is held. There is no replay: the subscriber
    /// only sees emissions that happen after this call.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong = Rc::new(callback);
        let weak = {
            let as_dyn: Callback<T> = strong.clone();
            Rc::downgrade(&as_dyn)
        };
        self.subscribers.borrow_mut().push(weak);
        Subscription { _callback: strong }
    }

    /// Notify all live subscribers, in registration order.
    ///
    /// Dead entries (dropped subscriptions) are compacted as a side
    /// effect.
    pub fn emit(&self, value: &T) {
        // Snapshot under the borrow, call outside it: a callback may
        // re-enter this stream (subscribe, emit).
        let live: Vec<Callback<T>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|weak| weak.strong_count() > 0);
            subs.iter().filter_map(|weak| weak.upgrade()).collect()
        };
        for callback in live {
            callback(value);
        }
    }

    /// Number of currently live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// RAII guard for a [`Stream`] subscription.
///
/// Dropping it unsubscribes; the callback will not fire again.
pub struct Subscription {
    _callback: Rc<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}
