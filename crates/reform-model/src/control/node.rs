#![forbid(unsafe_code)]

//! The private mutable state of a control node.
//!
//! Everything in this file is crate-internal. The public surface
//! (`ControlRef` and the typed handles) exposes read-only projections
//! and controlled mutation; the raw fields never leak.

use std::rc::Rc;

use reform_core::{ControlStatus, ValidationErrors, Value};
use reform_reactive::{Stream, TaskHandle};

use crate::control::ControlRef;
use crate::options::UpdateOn;
use crate::validators::{AsyncValidatorFn, RawSet, ValidatorFn, compose, compose_async};

pub(crate) type DisabledCallback = Rc<dyn Fn(bool)>;
pub(crate) type ChangeCallback = Rc<dyn Fn(&Value, bool)>;
pub(crate) type CollectionCallback = Rc<dyn Fn()>;

/// State shared by every node kind.
pub(crate) struct Node {
    pub kind: NodeKind,
    pub value: Value,
    pub status: ControlStatus,
    pub errors: Option<ValidationErrors>,
    pub pristine: bool,
    pub touched: bool,
    /// Non-owning upward pointer; set exclusively by the owning
    /// group/array through `set_parent`.
    pub parent: Option<crate::control::WeakControlRef>,
    pub validators: ValidatorState,
    pub update_on: Option<UpdateOn>,
    /// This node's *own* async validation is in flight (distinct from
    /// a descendant being pending).
    pub own_pending_async: bool,
    /// Cancel handle for the in-flight async validation, replaced and
    /// cancelled on supersession.
    pub async_validation: Option<TaskHandle>,
    /// Single-slot structural-change listener. For a child this is the
    /// owning collection's bubble-up closure; for a root it is
    /// whatever the host registered.
    pub on_collection_change: Option<CollectionCallback>,
    pub on_disabled_change: Vec<DisabledCallback>,
    pub value_changes: Stream<Value>,
    pub status_changes: Stream<ControlStatus>,
}

/// Kind-specific state. Closed: path walking and value reduction
/// pattern-match exhaustively over these three.
pub(crate) enum NodeKind {
    Leaf(LeafState),
    Group(GroupState),
    Array(ArrayState),
}

pub(crate) struct LeafState {
    /// Applied by `reset` when no explicit state is given.
    pub default_value: Value,
    /// Deferred-commit staging area (`update_on != Change`).
    pub pending_value: Value,
    pub pending_change: bool,
    pub pending_dirty: bool,
    pub pending_touched: bool,
    /// Model-to-view sync callbacks registered by the binding layer.
    pub on_change: Vec<ChangeCallback>,
}

impl LeafState {
    pub fn new(initial: Value) -> Self {
        Self {
            default_value: initial.clone(),
            pending_value: initial,
            pending_change: false,
            pending_dirty: false,
            pending_touched: false,
            on_change: Vec::new(),
        }
    }
}

/// Children addressed by string key; the vector preserves registration
/// order.
pub(crate) struct GroupState {
    pub children: Vec<(String, ControlRef)>,
}

impl GroupState {
    pub fn get(&self, name: &str) -> Option<&ControlRef> {
        self.children
            .iter()
            .find_map(|(key, child)| (key == name).then_some(child))
    }
}

/// Children addressed positionally; order is the array's shape.
pub(crate) struct ArrayState {
    pub children: Vec<ControlRef>,
}

/// Raw validator lists plus the composed functions derived from them.
///
/// The composed function is recomputed on every raw-list edit, never
/// lazily, so reading it is always cheap and allocation-free.
#[derive(Default)]
pub(crate) struct ValidatorState {
    sync_raw: RawSet<dyn Fn(&ControlRef) -> Option<ValidationErrors>>,
    sync_composed: Option<ValidatorFn>,
    async_raw: RawSet<dyn Fn(&ControlRef) -> reform_reactive::Task<Option<ValidationErrors>>>,
    async_composed: Option<AsyncValidatorFn>,
}

impl ValidatorState {
    pub fn new(sync: Vec<ValidatorFn>, r#async: Vec<AsyncValidatorFn>) -> Self {
        let mut state = Self {
            sync_raw: RawSet::from_list(sync),
            async_raw: RawSet::from_list(r#async),
            ..Self::default()
        };
        state.recompose();
        state
    }

    fn recompose(&mut self) {
        self.sync_composed = compose(self.sync_raw.as_slice());
        self.async_composed = compose_async(self.async_raw.as_slice());
    }

    pub fn composed(&self) -> Option<ValidatorFn> {
        self.sync_composed.clone()
    }

    pub fn composed_async(&self) -> Option<AsyncValidatorFn> {
        self.async_composed.clone()
    }

    pub fn has_async(&self) -> bool {
        self.async_composed.is_some()
    }

    pub fn set_sync(&mut self, fns: Vec<ValidatorFn>) {
        self.sync_raw.set(fns);
        self.recompose();
    }

    pub fn add_sync(&mut self, fns: Vec<ValidatorFn>) {
        self.sync_raw.add(fns);
        self.recompose();
    }

    pub fn remove_sync(&mut self, fns: &[ValidatorFn]) {
        self.sync_raw.remove(fns);
        self.recompose();
    }

    pub fn has_sync(&self, f: &ValidatorFn) -> bool {
        self.sync_raw.has(f)
    }

    pub fn clear_sync(&mut self) {
        self.sync_raw.clear();
        self.recompose();
    }

    pub fn set_async(&mut self, fns: Vec<AsyncValidatorFn>) {
        self.async_raw.set(fns);
        self.recompose();
    }

    pub fn add_async(&mut self, fns: Vec<AsyncValidatorFn>) {
        self.async_raw.add(fns);
        self.recompose();
    }

    pub fn remove_async(&mut self, fns: &[AsyncValidatorFn]) {
        self.async_raw.remove(fns);
        self.recompose();
    }

    pub fn has_async_fn(&self, f: &AsyncValidatorFn) -> bool {
        self.async_raw.has(f)
    }

    pub fn clear_async(&mut self) {
        self.async_raw.clear();
        self.recompose();
    }
}

impl Node {
    pub fn new(kind: NodeKind, value: Value, validators: ValidatorState, update_on: Option<UpdateOn>) -> Self {
        Self {
            kind,
            value,
            status: ControlStatus::Valid,
            errors: None,
            pristine: true,
            touched: false,
            parent: None,
            validators,
            update_on,
            own_pending_async: false,
            async_validation: None,
            on_collection_change: None,
            on_disabled_change: Vec::new(),
            value_changes: Stream::new(),
            status_changes: Stream::new(),
        }
    }
}
