#![forbid(unsafe_code)]

//! Propagation and construction options.

use reform_core::Value;

use crate::validators::{AsyncValidatorFn, ValidatorFn};

/// When a deferred-commit leaf flushes staged edits into its official
/// value.
///
/// Inherited: a control without an explicit setting uses its parent's,
/// bottoming out at [`UpdateOn::Change`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UpdateOn {
    /// Commit on every value write (no staging). The default.
    #[default]
    Change,
    /// Stage writes; commit when the host signals blur.
    Blur,
    /// Stage writes; commit when the host signals submit.
    Submit,
}

/// How a mutation propagates and whether it notifies subscribers.
///
/// The zero-configuration default is "propagate to ancestors, emit
/// events", matching what interactive edits want. Pass
/// [`UpdateOptions::self_only`] or [`UpdateOptions::silent`] to narrow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpdateOptions {
    /// When true, the operation affects only this control, not its
    /// ancestors.
    pub only_self: bool,
    /// When false, `value_changes`/`status_changes` stay silent for
    /// this operation.
    pub emit_event: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            only_self: false,
            emit_event: true,
        }
    }
}

impl UpdateOptions {
    /// Propagating, event-emitting (the default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Affect only this control; still emit events.
    #[must_use]
    pub fn self_only() -> Self {
        Self {
            only_self: true,
            ..Self::default()
        }
    }

    /// Propagate to ancestors without emitting events.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            emit_event: false,
            ..Self::default()
        }
    }

    /// Neither propagate nor emit.
    #[must_use]
    pub fn self_only_silent() -> Self {
        Self {
            only_self: true,
            emit_event: false,
        }
    }
}

/// Options for writing a leaf value, extending [`UpdateOptions`] with
/// the two view-sync suppression flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SetValueOptions {
    pub update: UpdateOptions,
    /// When false, registered `on_change` view-sync callbacks are not
    /// invoked for this write (the write came *from* the view).
    pub emit_model_to_view: bool,
    /// Forwarded to `on_change` callbacks as their second argument; the
    /// binding layer uses it to decide whether to fire its own
    /// model-change notification.
    pub emit_view_to_model: bool,
}

impl Default for SetValueOptions {
    fn default() -> Self {
        Self {
            update: UpdateOptions::default(),
            emit_model_to_view: true,
            emit_view_to_model: true,
        }
    }
}

impl From<UpdateOptions> for SetValueOptions {
    fn from(update: UpdateOptions) -> Self {
        Self {
            update,
            ..Self::default()
        }
    }
}

/// Construction-time configuration: validators and an update strategy.
///
/// Unrecognized concerns simply have no field here; there is nothing to
/// ignore.
#[derive(Clone, Default)]
pub struct ControlOptions {
    pub validators: Vec<ValidatorFn>,
    pub async_validators: Vec<AsyncValidatorFn>,
    pub update_on: Option<UpdateOn>,
}

impl ControlOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a synchronous validator.
    #[must_use]
    pub fn validator(mut self, f: ValidatorFn) -> Self {
        self.validators.push(f);
        self
    }

    /// Append an asynchronous validator.
    #[must_use]
    pub fn async_validator(mut self, f: AsyncValidatorFn) -> Self {
        self.async_validators.push(f);
        self
    }

    /// Set the update strategy for this control (children inherit it
    /// unless they set their own).
    #[must_use]
    pub fn update_on(mut self, update_on: UpdateOn) -> Self {
        self.update_on = Some(update_on);
        self
    }
}

impl std::fmt::Debug for ControlOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlOptions")
            .field("validators", &self.validators.len())
            .field("async_validators", &self.async_validators.len())
            .field("update_on", &self.update_on)
            .finish()
    }
}

/// An initial or reset state for a leaf control.
#[derive(Clone, Debug, PartialEq)]
pub enum FormState {
    /// Just a value; the control's disabled state is left untouched.
    Value(Value),
    /// A value plus an explicit enabled/disabled state to apply.
    Boxed { value: Value, disabled: bool },
}

impl FormState {
    /// A value that also disables the control when applied.
    pub fn disabled(value: impl Into<Value>) -> Self {
        FormState::Boxed {
            value: value.into(),
            disabled: true,
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            FormState::Value(v) | FormState::Boxed { value: v, .. } => v,
        }
    }
}

impl From<Value> for FormState {
    fn from(value: Value) -> Self {
        FormState::Value(value)
    }
}
