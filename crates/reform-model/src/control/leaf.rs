#![forbid(unsafe_code)]

//! The leaf control: holds a value directly, no children.

use std::ops::Deref;
use std::rc::Rc;

use reform_core::Value;

use crate::control::base::ControlRef;
use crate::control::node::{LeafState, Node, NodeKind, ValidatorState};
use crate::control::{DisabledChangeCallback, ViewChangeCallback};
use crate::options::{ControlOptions, FormState, SetValueOptions, UpdateOn, UpdateOptions};

/// A leaf of the form tree.
///
/// Derefs to [`ControlRef`] for the shared API; everything here is
/// leaf-specific: value writes with view-sync flags, reset states,
/// deferred-commit staging, and the binding-layer callback registry.
#[derive(Clone)]
pub struct FormControl {
    inner: ControlRef,
}

impl Deref for FormControl {
    type Target = ControlRef;

    fn deref(&self) -> &ControlRef {
        &self.inner
    }
}

impl std::fmt::Debug for FormControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormControl")
            .field("status", &self.status())
            .field("value", &self.value())
            .finish()
    }
}

impl From<FormControl> for ControlRef {
    fn from(control: FormControl) -> Self {
        control.inner
    }
}

impl From<&FormControl> for ControlRef {
    fn from(control: &FormControl) -> Self {
        control.inner.clone()
    }
}

impl FormControl {
    /// A control holding `value`, with no validators.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_options(FormState::Value(value.into()), ControlOptions::default())
    }

    /// A control built from an initial state (plain value or a boxed
    /// value-plus-disabled) and construction options.
    pub fn with_options(state: impl Into<FormState>, options: ControlOptions) -> Self {
        let state = state.into();
        let initial = state.value().clone();
        let validators = ValidatorState::new(options.validators, options.async_validators);
        let has_async = validators.has_async();
        let node = Node::new(
            NodeKind::Leaf(LeafState::new(initial.clone())),
            initial,
            validators,
            options.update_on,
        );
        let control = Self {
            inner: ControlRef::from_node(node),
        };
        control.inner.leaf_apply_form_state(&state);
        control.inner.update_value_and_validity(UpdateOptions {
            only_self: true,
            emit_event: has_async,
        });
        control
    }

    pub(crate) fn from_ref(inner: ControlRef) -> Self {
        Self { inner }
    }

    /// The value `reset` falls back to: the construction value.
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.inner.with_leaf(|leaf| leaf.default_value.clone())
    }

    /// Write the value.
    ///
    /// Under `UpdateOn::Change` this commits immediately: official
    /// value, view-sync callbacks (per the options), revalidation,
    /// propagation. Under `Blur`/`Submit` the write is staged until
    /// [`sync_pending_controls`](ControlRef::sync_pending_controls).
    pub fn set_value(&self, value: impl Into<Value>, opts: SetValueOptions) {
        self.inner.leaf_set_value(value.into(), opts);
    }

    /// Identical to [`set_value`](Self::set_value); a leaf has no
    /// partial shape to merge.
    pub fn patch_value(&self, value: impl Into<Value>, opts: SetValueOptions) {
        self.set_value(value, opts);
    }

    /// Reset to an explicit state (plain value, or boxed to also
    /// enable/disable).
    pub fn reset_to(&self, state: impl Into<FormState>, opts: UpdateOptions) {
        self.inner.leaf_reset_opt(Some(state.into()), opts);
    }

    /// Record the host's blur signal for a deferred-commit control;
    /// flushed as touched-state by `sync_pending_controls`.
    pub fn stage_touched(&self) {
        self.inner.with_leaf(|leaf| leaf.pending_touched = true);
    }

    /// Register a model-to-view sync callback. The binding layer uses
    /// this to push programmatic value changes into the view; the
    /// second argument mirrors the write's `emit_view_to_model` flag.
    pub fn register_on_change(&self, callback: ViewChangeCallback) {
        self.inner.with_leaf(|leaf| leaf.on_change.push(callback));
    }

    /// Remove a previously registered sync callback, by function
    /// identity.
    pub fn unregister_on_change(&self, callback: &ViewChangeCallback) {
        self.inner.with_leaf(|leaf| {
            leaf.on_change.retain(|existing| !Rc::ptr_eq(existing, callback));
        });
    }

    /// Register a callback fired after this control is disabled or
    /// enabled (argument: the new disabled state).
    pub fn register_on_disabled_change(&self, callback: DisabledChangeCallback) {
        self.inner.with_mut(|n| n.on_disabled_change.push(callback));
    }

    /// Remove a previously registered disabled-change callback, by
    /// function identity.
    pub fn unregister_on_disabled_change(&self, callback: &DisabledChangeCallback) {
        self.inner.with_mut(|n| {
            n.on_disabled_change
                .retain(|existing| !Rc::ptr_eq(existing, callback));
        });
    }
}

// ---------------------------------------------------------------------------
// Leaf internals shared with the dispatchers in base.rs
// ---------------------------------------------------------------------------

impl ControlRef {
    pub(crate) fn leaf_apply_form_state(&self, state: &FormState) {
        let value = state.value().clone();
        self.with_mut(|n| {
            n.value = value.clone();
            if let NodeKind::Leaf(leaf) = &mut n.kind {
                leaf.pending_value = value;
            }
        });
        if let FormState::Boxed { disabled, .. } = state {
            if *disabled {
                self.disable(UpdateOptions::self_only_silent());
            } else {
                self.enable(UpdateOptions::self_only_silent());
            }
        }
    }

    /// Value write entry point: stages under a deferred update
    /// strategy, commits otherwise.
    ///
    /// Writing through here marks the control dirty; `reset` commits
    /// through [`leaf_commit_value`](Self::leaf_commit_value) directly
    /// and so stays pristine.
    pub(crate) fn leaf_set_value(&self, value: Value, opts: SetValueOptions) {
        if self.update_on() != UpdateOn::Change {
            self.with_leaf(|leaf| {
                leaf.pending_value = value;
                leaf.pending_change = true;
                leaf.pending_dirty = true;
            });
            return;
        }
        self.mark_as_dirty(opts.update);
        self.leaf_commit_value(value, opts);
    }

    /// Unconditional commit: official value, view-sync callbacks,
    /// revalidation.
    pub(crate) fn leaf_commit_value(&self, value: Value, opts: SetValueOptions) {
        self.with_mut(|n| {
            n.value = value.clone();
            if let NodeKind::Leaf(leaf) = &mut n.kind {
                leaf.pending_value = value;
            }
        });
        let callbacks = self.with_leaf(|leaf| leaf.on_change.clone());
        if opts.emit_model_to_view {
            let current = self.value();
            for callback in callbacks {
                callback(&current, opts.emit_view_to_model);
            }
        }
        self.update_value_and_validity(opts.update);
    }

    pub(crate) fn leaf_reset_opt(&self, state: Option<FormState>, opts: UpdateOptions) {
        let state =
            state.unwrap_or_else(|| FormState::Value(self.with_leaf(|leaf| leaf.default_value.clone())));
        self.leaf_apply_form_state(&state);
        self.mark_as_pristine(opts);
        self.mark_as_untouched(opts);
        self.leaf_commit_value(self.value(), SetValueOptions::from(opts));
        self.with_leaf(|leaf| leaf.pending_change = false);
    }
}
