#![forbid(unsafe_code)]

//! The control tree: leaves, keyed groups, indexed groups, and the
//! shared propagation machinery behind [`ControlRef`].

use std::rc::Rc;

use reform_core::Value;

mod array;
mod base;
mod group;
mod leaf;
mod node;
mod path;

pub use array::FormArray;
pub use base::{ControlKind, ControlRef};
pub use group::FormGroup;
pub use leaf::FormControl;

pub(crate) use base::WeakControlRef;

/// Model-to-view sync callback: the new value, plus whether the
/// binding layer should fire its own model-change notification.
pub type ViewChangeCallback = Rc<dyn Fn(&Value, bool)>;

/// Fired after a control's disabled state changes (argument: the new
/// disabled state).
pub type DisabledChangeCallback = Rc<dyn Fn(bool)>;
