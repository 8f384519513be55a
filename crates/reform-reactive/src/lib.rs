#![forbid(unsafe_code)]

//! Change-notification primitives for the `reform` control tree.
//!
//! Two building blocks live here:
//!
//! - [`Stream`]: a broadcast channel with RAII [`Subscription`]s. Each
//!   control node owns one stream for value changes and one for status
//!   changes. A new subscriber sees only future emissions; there is no
//!   replay of the current value; read the control directly for that.
//! - [`Task`]: a one-shot cancellable deferred value, the contract an
//!   asynchronous validator must satisfy. The engine subscribes via
//!   [`Task::on_resolve`] and cancels the returned [`TaskHandle`]
//!   before starting a superseding validation, so a stale result is
//!   silently dropped rather than racing the newer one.
//!
//! # Architecture
//!
//! Everything is `Rc<RefCell<..>>` single-threaded shared state; the
//! control tree assumes one logical thread of control (a cooperative
//! UI update model), and the types are deliberately `!Send`.
//!
//! [`Subscription`]: stream::Subscription
//! [`TaskHandle`]: task::TaskHandle

pub mod stream;
pub mod task;

pub use stream::{Stream, Subscription};
pub use task::{Resolver, Task, TaskHandle};
