#![forbid(unsafe_code)]

//! Core data types for the `reform` control tree.
//!
//! This crate holds the pieces every other `reform` crate agrees on:
//!
//! - [`Value`]: the dynamic value carried by a control node; a scalar
//!   for a leaf, a record for a keyed group, a sequence for an array.
//! - [`ControlStatus`]: the four mutually exclusive validity states.
//! - [`ValidationErrors`]: the error-code map produced by validators.
//! - [`FormError`]: programming-contract violations raised by strict
//!   mutation APIs.
//!
//! Nothing here knows about the control tree itself; see `reform-model`
//! for the nodes and the propagation engine.

pub mod errors;
pub mod status;
pub mod value;

pub use errors::{FormError, ValidationErrors};
pub use status::ControlStatus;
pub use value::Value;
