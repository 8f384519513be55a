#![forbid(unsafe_code)]

//! One-shot cancellable deferred values.
//!
//! A [`Task<T>`] is the result contract for asynchronous work in the
//! control tree: it resolves at most once, delivery can be wired up
//! after creation, and the consumer can walk away at any time by
//! cancelling its [`TaskHandle`]. There is no cancellation signal to
//! the producer side: a [`Resolver`] whose consumer has cancelled
//! still resolves, but the value is dropped unobserved.
//!
//! # Invariants
//!
//! 1. A task resolves at most once; a second `resolve` has no effect.
//! 2. `on_resolve` on an already-resolved task delivers synchronously.
//! 3. After `TaskHandle::cancel()` (or drop), the delivery callback is
//!    gone and can never fire.
//! 4. Cancelling after delivery is a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

enum TaskState<T> {
    /// Not resolved; `callback` is present once a consumer is wired.
    Pending { callback: Option<Box<dyn FnOnce(T)>> },
    /// Resolved before a consumer attached; value parked for delivery.
    Resolved(Option<T>),
    /// Delivered or cancelled; nothing left to do.
    Done,
}

/// A deferred value that resolves at most once.
pub struct Task<T> {
    state: Rc<RefCell<TaskState<T>>>,
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.borrow() {
            TaskState::Pending { .. } => "pending",
            TaskState::Resolved(_) => "resolved",
            TaskState::Done => "done",
        };
        f.debug_struct("Task").field("state", &state).finish()
    }
}

impl<T: 'static> Task<T> {
    /// Create an unresolved task and the resolver that completes it.
    #[must_use]
    pub fn pending() -> (Task<T>, Resolver<T>) {
        let state = Rc::new(RefCell::new(TaskState::Pending { callback: None }));
        (
            Task {
                state: Rc::clone(&state),
            },
            Resolver { state },
        )
    }

    /// Create a task that is already resolved with `value`.
    ///
    /// `on_resolve` on such a task delivers synchronously, which is how
    /// an "async" validator that can answer immediately behaves.
    #[must_use]
    pub fn ready(value: T) -> Task<T> {
        Task {
            state: Rc::new(RefCell::new(TaskState::Resolved(Some(value)))),
        }
    }

    /// Wire the delivery callback and return a cancel handle.
    ///
    /// If the task already resolved, `callback` runs before this
    /// returns. Only one consumer may attach; the task is single-shot
    /// by construction.
    #[must_use = "dropping the TaskHandle cancels delivery"]
    pub fn on_resolve(&self, callback: impl FnOnce(T) + 'static) -> TaskHandle {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            TaskState::Pending { callback: slot } => {
                debug_assert!(slot.is_none(), "task already has a consumer");
                *slot = Some(Box::new(callback));
                drop(state);
            }
            TaskState::Resolved(value) => {
                let parked = value.take();
                *state = TaskState::Done;
                // Deliver outside the borrow; the callback may re-enter.
                drop(state);
                if let Some(value) = parked {
                    callback(value);
                }
            }
            TaskState::Done => drop(state),
        }
        let state: Rc<dyn Cancellable> = self.state.clone();
        TaskHandle {
            state: Rc::downgrade(&state),
        }
    }
}

/// Producer side of a [`Task`].
pub struct Resolver<T> {
    state: Rc<RefCell<TaskState<T>>>,
}

impl<T> std::fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish()
    }
}

impl<T: 'static> Resolver<T> {
    /// Complete the task.
    ///
    /// Delivers synchronously when a consumer is wired; parks the value
    /// when none is yet; drops the value silently when the consumer
    /// cancelled. Resolving twice is a no-op.
    pub fn resolve(self, value: T) {
        let action = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                TaskState::Pending { callback } => match callback.take() {
                    Some(cb) => {
                        *state = TaskState::Done;
                        Some(cb)
                    }
                    None => {
                        *state = TaskState::Resolved(Some(value));
                        return;
                    }
                },
                // Cancelled (Done) or double-resolve: drop the value.
                TaskState::Resolved(_) | TaskState::Done => {
                    trace!("task resolved after cancellation; result dropped");
                    None
                }
            }
        };
        if let Some(cb) = action {
            cb(value);
        }
    }
}

/// Consumer-side cancel handle for a wired [`Task`].
///
/// Cancelling (explicitly or by drop) detaches the delivery callback;
/// a late resolve becomes a silent no-op. This is the supersession
/// mechanism the validation engine relies on: cancel the old handle
/// first, then start the new validation, and the newer result always
/// wins.
pub struct TaskHandle {
    state: Weak<dyn Cancellable>,
}

impl TaskHandle {
    /// Detach delivery. Idempotent; a no-op after delivery already
    /// happened.
    pub fn cancel(&self) {
        if let Some(state) = self.state.upgrade() {
            state.cancel();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish()
    }
}

/// Object-safe cancellation, so [`TaskHandle`] does not carry the
/// task's value type.
trait Cancellable {
    fn cancel(&self);
}

impl<T> Cancellable for RefCell<TaskState<T>> {
    fn cancel(&self) {
        // Drops any wired callback or parked value; already-Done stays
        // Done, which makes cancel idempotent.
        *self.borrow_mut() = TaskState::Done;
    }
}
