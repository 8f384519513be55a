#![forbid(unsafe_code)]

//! Reactive form-control tree.
//!
//! A form is a tree: [`FormControl`] leaves hold values, [`FormGroup`]
//! nodes key children by name, [`FormArray`] nodes index them
//! positionally. Every node tracks a value, a validity status, an
//! error map, and the pristine/touched interaction flags; mutations
//! propagate so that a parent's state is always consistent with its
//! children's.
//!
//! ```
//! use reform_model::{FormControl, FormGroup, UpdateOptions, Value, validator};
//! use reform_model::errors;
//!
//! let required = validator(|c| c.value().is_null().then(|| errors! { "required" => true }));
//! let name = FormControl::with_options(
//!     Value::Null,
//!     reform_model::ControlOptions::new().validator(required),
//! );
//! let form = FormGroup::new([("name", name)]);
//!
//! assert!(form.invalid());
//! form.get("name").unwrap().set_value("Ada".into(), UpdateOptions::default()).unwrap();
//! assert!(form.valid());
//! ```
//!
//! Single-threaded by design: handles are `Rc`-based and `!Send`, like
//! the UI trees they model.

pub mod control;
pub mod options;
pub mod validators;

pub use control::{
    ControlKind, ControlRef, DisabledChangeCallback, FormArray, FormControl, FormGroup,
    ViewChangeCallback,
};
pub use options::{ControlOptions, FormState, SetValueOptions, UpdateOn, UpdateOptions};
pub use validators::{AsyncValidatorFn, ValidatorFn, async_validator, compose, compose_async, validator};

pub use reform_core::{ControlStatus, FormError, ValidationErrors, Value, errors};
pub use reform_reactive::{Resolver, Stream, Subscription, Task, TaskHandle};
