#![forbid(unsafe_code)]

//! The erased control handle and the propagation engine.
//!
//! [`ControlRef`] is a cheap clonable handle to one node of the form
//! tree. All shared behavior lives here: validator management, the
//! mark-as-* family, disable/enable, and `update_value_and_validity`,
//! the central recompute-and-notify algorithm.
//!
//! # Invariants
//!
//! 1. Exactly one [`ControlStatus`] holds after any
//!    `update_value_and_validity` call completes.
//! 2. Children are recomputed before their parent: every group/array
//!    operation updates children first, itself second, ancestors
//!    third. Violating this order yields stale aggregate status.
//! 3. The status write is atomic from the caller's point of view; no
//!    subscriber observes a node mid-recompute.
//! 4. At most one async validation is in flight per node; starting a
//!    new one cancels the old handle first, so the newer result always
//!    wins.
//!
//! # Borrow discipline
//!
//! Nodes are `Rc<RefCell<..>>`. Every method snapshots what it needs
//! (child handles, stream handles, callbacks) under a short borrow and
//! releases it before recursing or invoking user code. No borrow is
//! ever held across a call that can re-enter the same node.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use reform_core::{ControlStatus, FormError, ValidationErrors, Value};
use tracing::trace;

use crate::control::node::{LeafState, Node, NodeKind};
use crate::options::{SetValueOptions, UpdateOn, UpdateOptions};
use crate::validators::{AsyncValidatorFn, ValidatorFn};

/// Which kind of node a [`ControlRef`] addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlKind {
    Leaf,
    Group,
    Array,
}

/// A handle to one control node.
///
/// Clones address the same node; the typed handles ([`FormControl`],
/// [`FormGroup`], [`FormArray`]) deref to this and add kind-specific
/// operations.
///
/// [`FormControl`]: crate::control::FormControl
/// [`FormGroup`]: crate::control::FormGroup
/// [`FormArray`]: crate::control::FormArray
pub struct ControlRef {
    pub(crate) node: Rc<RefCell<Node>>,
}

impl Clone for ControlRef {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl std::fmt::Debug for ControlRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlRef")
            .field("kind", &self.kind())
            .field("status", &self.status())
            .field("value", &self.value())
            .finish()
    }
}

/// Non-owning handle used for the upward parent pointer.
pub(crate) struct WeakControlRef {
    node: Weak<RefCell<Node>>,
}

impl WeakControlRef {
    pub fn upgrade(&self) -> Option<ControlRef> {
        self.node.upgrade().map(|node| ControlRef { node })
    }
}

// ---------------------------------------------------------------------------
// Construction and node access
// ---------------------------------------------------------------------------

impl ControlRef {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node: Rc::new(RefCell::new(node)),
        }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.node.borrow())
    }

    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(&mut Node) -> R) -> R {
        f(&mut self.node.borrow_mut())
    }

    pub(crate) fn downgrade(&self) -> WeakControlRef {
        WeakControlRef {
            node: Rc::downgrade(&self.node),
        }
    }

    /// Whether two handles address the same node.
    #[must_use]
    pub fn ptr_eq(a: &ControlRef, b: &ControlRef) -> bool {
        Rc::ptr_eq(&a.node, &b.node)
    }

    #[must_use]
    pub fn kind(&self) -> ControlKind {
        self.with(|n| match &n.kind {
            NodeKind::Leaf(_) => ControlKind::Leaf,
            NodeKind::Group(_) => ControlKind::Group,
            NodeKind::Array(_) => ControlKind::Array,
        })
    }

    /// Snapshot of the direct children (empty for a leaf).
    #[must_use]
    pub fn children(&self) -> Vec<ControlRef> {
        self.with(|n| match &n.kind {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::Group(g) => g.children.iter().map(|(_, c)| c.clone()).collect(),
            NodeKind::Array(a) => a.children.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Read API
// ---------------------------------------------------------------------------

impl ControlRef {
    /// The current aggregate value. For a group/array this excludes
    /// disabled children unless the node itself is disabled; see
    /// [`raw_value`](Self::raw_value) for everything.
    #[must_use]
    pub fn value(&self) -> Value {
        self.with(|n| n.value.clone())
    }

    /// The aggregate value including disabled children.
    #[must_use]
    pub fn raw_value(&self) -> Value {
        enum Snapshot {
            Leaf(Value),
            Group(Vec<(String, ControlRef)>),
            Array(Vec<ControlRef>),
        }
        let snapshot = self.with(|n| match &n.kind {
            NodeKind::Leaf(_) => Snapshot::Leaf(n.value.clone()),
            NodeKind::Group(g) => Snapshot::Group(g.children.clone()),
            NodeKind::Array(a) => Snapshot::Array(a.children.clone()),
        });
        match snapshot {
            Snapshot::Leaf(value) => value,
            Snapshot::Group(children) => Value::Map(
                children
                    .into_iter()
                    .map(|(name, child)| (name, child.raw_value()))
                    .collect(),
            ),
            Snapshot::Array(children) => {
                Value::List(children.iter().map(ControlRef::raw_value).collect())
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> ControlStatus {
        self.with(|n| n.status)
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.status() == ControlStatus::Valid
    }

    #[must_use]
    pub fn invalid(&self) -> bool {
        self.status() == ControlStatus::Invalid
    }

    #[must_use]
    pub fn pending(&self) -> bool {
        self.status() == ControlStatus::Pending
    }

    #[must_use]
    pub fn disabled(&self) -> bool {
        self.status() == ControlStatus::Disabled
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.status() != ControlStatus::Disabled
    }

    /// Errors from this node's own validators (or injected via
    /// [`set_errors`](Self::set_errors)). A group can be invalid with
    /// no local errors when a child is invalid.
    #[must_use]
    pub fn errors(&self) -> Option<ValidationErrors> {
        self.with(|n| n.errors.clone())
    }

    #[must_use]
    pub fn pristine(&self) -> bool {
        self.with(|n| n.pristine)
    }

    #[must_use]
    pub fn dirty(&self) -> bool {
        !self.pristine()
    }

    #[must_use]
    pub fn touched(&self) -> bool {
        self.with(|n| n.touched)
    }

    #[must_use]
    pub fn untouched(&self) -> bool {
        !self.touched()
    }

    #[must_use]
    pub fn parent(&self) -> Option<ControlRef> {
        self.with(|n| n.parent.as_ref().and_then(WeakControlRef::upgrade))
    }

    /// The top-level ancestor (self when unattached).
    #[must_use]
    pub fn root(&self) -> ControlRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The effective update strategy: own setting, else inherited from
    /// the parent chain, else [`UpdateOn::Change`].
    #[must_use]
    pub fn update_on(&self) -> UpdateOn {
        match self.with(|n| n.update_on) {
            Some(update_on) => update_on,
            None => self.parent().map_or(UpdateOn::Change, |p| p.update_on()),
        }
    }

    /// Stream of aggregate-value emissions. No replay: subscribe, then
    /// read [`value`](Self::value) for the current state.
    #[must_use]
    pub fn value_changes(&self) -> reform_reactive::Stream<Value> {
        self.with(|n| n.value_changes.clone())
    }

    /// Stream of status emissions. No replay.
    #[must_use]
    pub fn status_changes(&self) -> reform_reactive::Stream<ControlStatus> {
        self.with(|n| n.status_changes.clone())
    }
}

// ---------------------------------------------------------------------------
// Validator management
// ---------------------------------------------------------------------------
//
// None of these revalidate on their own; call
// `update_value_and_validity` afterwards for the edit to take effect.

impl ControlRef {
    /// Replace the synchronous validator list.
    pub fn set_validators(&self, fns: Vec<ValidatorFn>) {
        self.with_mut(|n| n.validators.set_sync(fns));
    }

    /// Add synchronous validators, skipping ones already present (by
    /// function identity).
    pub fn add_validators(&self, fns: Vec<ValidatorFn>) {
        self.with_mut(|n| n.validators.add_sync(fns));
    }

    /// Remove synchronous validators by function identity; unknown
    /// entries are ignored.
    pub fn remove_validators(&self, fns: &[ValidatorFn]) {
        self.with_mut(|n| n.validators.remove_sync(fns));
    }

    #[must_use]
    pub fn has_validator(&self, f: &ValidatorFn) -> bool {
        self.with(|n| n.validators.has_sync(f))
    }

    pub fn clear_validators(&self) {
        self.with_mut(|n| n.validators.clear_sync());
    }

    /// Replace the asynchronous validator list.
    pub fn set_async_validators(&self, fns: Vec<AsyncValidatorFn>) {
        self.with_mut(|n| n.validators.set_async(fns));
    }

    pub fn add_async_validators(&self, fns: Vec<AsyncValidatorFn>) {
        self.with_mut(|n| n.validators.add_async(fns));
    }

    pub fn remove_async_validators(&self, fns: &[AsyncValidatorFn]) {
        self.with_mut(|n| n.validators.remove_async(fns));
    }

    #[must_use]
    pub fn has_async_validator(&self, f: &AsyncValidatorFn) -> bool {
        self.with(|n| n.validators.has_async_fn(f))
    }

    pub fn clear_async_validators(&self) {
        self.with_mut(|n| n.validators.clear_async());
    }
}

// ---------------------------------------------------------------------------
// Interaction flags (mark-as-* family)
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Mark touched; bubbles to ancestors unless `only_self`. Never
    /// touches children.
    pub fn mark_as_touched(&self, opts: UpdateOptions) {
        self.with_mut(|n| n.touched = true);
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.mark_as_touched(opts);
        }
    }

    /// Mark this node and every descendant touched, the one operation
    /// that pushes touched state downward.
    pub fn mark_all_as_touched(&self) {
        self.mark_as_touched(UpdateOptions::self_only());
        for child in self.children() {
            child.mark_all_as_touched();
        }
    }

    /// Mark untouched; pushes down into every child, then recomputes
    /// each ancestor's touched state from its children.
    pub fn mark_as_untouched(&self, opts: UpdateOptions) {
        self.with_mut(|n| {
            n.touched = false;
            if let NodeKind::Leaf(leaf) = &mut n.kind {
                leaf.pending_touched = false;
            }
        });
        for child in self.children() {
            child.mark_as_untouched(UpdateOptions::self_only());
        }
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.update_touched(opts);
        }
    }

    /// Mark dirty; bubbles to ancestors unless `only_self`.
    pub fn mark_as_dirty(&self, opts: UpdateOptions) {
        self.with_mut(|n| n.pristine = false);
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.mark_as_dirty(opts);
        }
    }

    /// Mark pristine; pushes down into every child, then recomputes
    /// each ancestor's pristine state from its children.
    pub fn mark_as_pristine(&self, opts: UpdateOptions) {
        self.with_mut(|n| {
            n.pristine = true;
            if let NodeKind::Leaf(leaf) = &mut n.kind {
                leaf.pending_dirty = false;
            }
        });
        for child in self.children() {
            child.mark_as_pristine(UpdateOptions::self_only());
        }
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.update_pristine(opts);
        }
    }

    /// Set status to `Pending`. Bubbles to ancestors unconditionally
    /// (pending always bubbles, regardless of sibling state).
    pub fn mark_as_pending(&self, opts: UpdateOptions) {
        self.with_mut(|n| n.status = ControlStatus::Pending);
        if opts.emit_event {
            self.status_changes().emit(&ControlStatus::Pending);
        }
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.mark_as_pending(opts);
        }
    }

    /// Recompute `touched` from enabled children, recursing upward.
    pub(crate) fn update_touched(&self, opts: UpdateOptions) {
        let touched = self.any_enabled_child(|c| c.touched());
        self.with_mut(|n| n.touched = touched);
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.update_touched(opts);
        }
    }

    /// Recompute `pristine` from enabled children, recursing upward.
    pub(crate) fn update_pristine(&self, opts: UpdateOptions) {
        let pristine = !self.any_enabled_child(|c| c.dirty());
        self.with_mut(|n| n.pristine = pristine);
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.update_pristine(opts);
        }
    }

    fn any_enabled_child(&self, pred: impl Fn(&ControlRef) -> bool) -> bool {
        self.children()
            .iter()
            .any(|child| child.enabled() && pred(child))
    }
}

// ---------------------------------------------------------------------------
// Disable / enable
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Disable this node and every descendant, then renotify ancestors.
    ///
    /// Disabled nodes are exempt from validation and excluded from
    /// ancestor aggregate values; local errors are cleared.
    pub fn disable(&self, opts: UpdateOptions) {
        // Computed before mutation: whether the parent was marked
        // artificially dirty (dirty with no dirty children), in which
        // case the ancestor pristine recompute must be skipped.
        let skip_pristine_check = self.parent_marked_dirty(opts.only_self);

        trace!(kind = ?self.kind(), "disable");
        self.with_mut(|n| {
            n.status = ControlStatus::Disabled;
            n.errors = None;
        });
        for child in self.children() {
            child.disable(UpdateOptions {
                only_self: true,
                emit_event: opts.emit_event,
            });
        }
        self.update_value();
        if opts.emit_event {
            self.value_changes().emit(&self.value());
            self.status_changes().emit(&ControlStatus::Disabled);
        }
        self.update_ancestors(opts, skip_pristine_check);
        for callback in self.with(|n| n.on_disabled_change.clone()) {
            callback(true);
        }
    }

    /// Re-enable this node and every descendant, recompute validity,
    /// then renotify ancestors.
    pub fn enable(&self, opts: UpdateOptions) {
        let skip_pristine_check = self.parent_marked_dirty(opts.only_self);

        trace!(kind = ?self.kind(), "enable");
        self.with_mut(|n| n.status = ControlStatus::Valid);
        for child in self.children() {
            child.enable(UpdateOptions {
                only_self: true,
                emit_event: opts.emit_event,
            });
        }
        self.update_value_and_validity(UpdateOptions {
            only_self: true,
            emit_event: opts.emit_event,
        });
        self.update_ancestors(opts, skip_pristine_check);
        for callback in self.with(|n| n.on_disabled_change.clone()) {
            callback(false);
        }
    }

    fn update_ancestors(&self, opts: UpdateOptions, skip_pristine_check: bool) {
        if opts.only_self {
            return;
        }
        if let Some(parent) = self.parent() {
            parent.update_value_and_validity(opts);
            if !skip_pristine_check {
                parent.update_pristine(UpdateOptions::default());
            }
            parent.update_touched(UpdateOptions::default());
        }
    }

    /// Whether the parent is dirty despite having no dirty children,
    /// i.e. it was marked dirty artificially and must not be recomputed
    /// back to pristine as a side effect of disabling a child.
    fn parent_marked_dirty(&self, only_self: bool) -> bool {
        if only_self {
            return false;
        }
        match self.parent() {
            Some(parent) => parent.dirty() && !parent.any_enabled_child(|c| c.dirty()),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// The propagation engine
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Recalculate this node's value and validity, then its ancestors'.
    ///
    /// The algorithm, in order:
    ///
    /// 1. Reset the status baseline (`Disabled` when every child is
    ///    disabled, else `Valid`).
    /// 2. Recompute the aggregate value from children (no-op for a
    ///    leaf).
    /// 3. When enabled: cancel any in-flight async validation, run the
    ///    composed sync validator into `errors`, derive the status, and
    ///    when the result is `Valid` or `Pending` start the async
    ///    validator.
    /// 4. Emit on `value_changes`/`status_changes` unless suppressed.
    /// 5. Recurse into the parent unless `only_self`.
    pub fn update_value_and_validity(&self, opts: UpdateOptions) {
        self.set_initial_status();
        self.update_value();
        if self.enabled() {
            self.cancel_existing_async_validation();
            let errors = self.run_validator();
            self.with_mut(|n| n.errors = errors);
            let status = self.calculate_status();
            self.with_mut(|n| n.status = status);
            if matches!(status, ControlStatus::Valid | ControlStatus::Pending) {
                self.run_async_validator(opts.emit_event);
            }
        }
        trace!(kind = ?self.kind(), status = %self.status(), "update_value_and_validity");
        if opts.emit_event {
            self.value_changes().emit(&self.value());
            self.status_changes().emit(&self.status());
        }
        if !opts.only_self
            && let Some(parent) = self.parent()
        {
            parent.update_value_and_validity(opts);
        }
    }

    /// Revalidate the whole subtree depth-first (children before
    /// self), without propagating past this node.
    pub fn update_tree_validity(&self, opts: UpdateOptions) {
        for child in self.children() {
            child.update_tree_validity(opts);
        }
        self.update_value_and_validity(UpdateOptions {
            only_self: true,
            emit_event: opts.emit_event,
        });
    }

    fn set_initial_status(&self) {
        let status = if self.all_controls_disabled() {
            ControlStatus::Disabled
        } else {
            ControlStatus::Valid
        };
        self.with_mut(|n| n.status = status);
    }

    /// Disabled aggregation: a leaf is "all disabled" iff it is
    /// disabled; a group/array iff every child is disabled and it has
    /// at least one child, or it has none and was itself disabled.
    pub(crate) fn all_controls_disabled(&self) -> bool {
        let children = match self.with(|n| match &n.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Group(g) => Some(g.children.iter().map(|(_, c)| c.clone()).collect::<Vec<_>>()),
            NodeKind::Array(a) => Some(a.children.clone()),
        }) {
            None => return self.disabled(),
            Some(children) => children,
        };
        if children.iter().any(|child| child.enabled()) {
            return false;
        }
        !children.is_empty() || self.disabled()
    }

    /// Recompute the aggregate value from children. No-op for a leaf.
    pub(crate) fn update_value(&self) {
        enum Snapshot {
            Leaf,
            Group(Vec<(String, ControlRef)>),
            Array(Vec<ControlRef>),
        }
        let snapshot = self.with(|n| match &n.kind {
            NodeKind::Leaf(_) => Snapshot::Leaf,
            NodeKind::Group(g) => Snapshot::Group(g.children.clone()),
            NodeKind::Array(a) => Snapshot::Array(a.children.clone()),
        });
        let include_disabled = self.disabled();
        let new_value = match snapshot {
            Snapshot::Leaf => return,
            Snapshot::Group(children) => Value::Map(
                children
                    .into_iter()
                    .filter(|(_, child)| child.enabled() || include_disabled)
                    .map(|(name, child)| (name, child.value()))
                    .collect(),
            ),
            Snapshot::Array(children) => Value::List(
                children
                    .iter()
                    .filter(|child| child.enabled() || include_disabled)
                    .map(|child| child.value())
                    .collect(),
            ),
        };
        self.with_mut(|n| n.value = new_value);
    }

    fn run_validator(&self) -> Option<ValidationErrors> {
        let composed = self.with(|n| n.validators.composed());
        composed.and_then(|validator| validator(self))
    }

    /// Status derivation, in precedence order: Disabled, then local
    /// errors, then own-or-descendant pending, then descendant
    /// invalid, else Valid.
    fn calculate_status(&self) -> ControlStatus {
        if self.all_controls_disabled() {
            return ControlStatus::Disabled;
        }
        if self.with(|n| n.errors.is_some()) {
            return ControlStatus::Invalid;
        }
        if self.with(|n| n.own_pending_async)
            || self.any_enabled_child(|c| c.status() == ControlStatus::Pending)
        {
            return ControlStatus::Pending;
        }
        if self.any_enabled_child(|c| c.status() == ControlStatus::Invalid) {
            return ControlStatus::Invalid;
        }
        ControlStatus::Valid
    }

    fn run_async_validator(&self, emit_event: bool) {
        let Some(validator) = self.with(|n| n.validators.composed_async()) else {
            return;
        };
        self.with_mut(|n| {
            n.status = ControlStatus::Pending;
            n.own_pending_async = true;
        });
        let task = validator(self);
        let weak = self.downgrade();
        let handle = task.on_resolve(move |errors| {
            if let Some(control) = weak.upgrade() {
                // The status recompute inside set_errors reads the
                // own-pending flag; it must be cleared first.
                control.with_mut(|n| n.own_pending_async = false);
                control.set_errors(errors, emit_event);
            }
        });
        self.with_mut(|n| n.async_validation = Some(handle));
    }

    fn cancel_existing_async_validation(&self) {
        if let Some(handle) = self.with_mut(|n| n.async_validation.take()) {
            handle.cancel();
            self.with_mut(|n| n.own_pending_async = false);
        }
    }

    /// Inject errors directly, bypassing the sync validator run: the
    /// path manual error injection and async validator results take.
    ///
    /// Recomputes *status only* (not value) on this node and every
    /// ancestor, which is cheaper than a full
    /// `update_value_and_validity`. The upward pass is unconditional,
    /// so the only knob is whether `status_changes` fires.
    pub fn set_errors(&self, errors: Option<ValidationErrors>, emit_event: bool) {
        self.with_mut(|n| n.errors = errors);
        self.update_controls_errors(emit_event);
    }

    fn update_controls_errors(&self, emit_event: bool) {
        let status = self.calculate_status();
        self.with_mut(|n| n.status = status);
        if emit_event {
            self.status_changes().emit(&status);
        }
        if let Some(parent) = self.parent() {
            parent.update_controls_errors(emit_event);
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred-commit flush
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Flush staged deferred-commit edits (`update_on != Change`).
    ///
    /// For a leaf: promotes the staged value/dirty/touched state into
    /// the official one. For a group/array: flushes every child, then
    /// revalidates once if anything changed. Returns whether a value
    /// was committed anywhere in the subtree.
    ///
    /// Called by the host binding layer on its blur/submit signal.
    pub fn sync_pending_controls(&self) -> bool {
        match self.kind() {
            ControlKind::Leaf => {
                if self.update_on() == UpdateOn::Change {
                    return false;
                }
                let (pending_dirty, pending_touched, pending_change, pending_value) =
                    self.with(|n| match &n.kind {
                        NodeKind::Leaf(leaf) => (
                            leaf.pending_dirty,
                            leaf.pending_touched,
                            leaf.pending_change,
                            leaf.pending_value.clone(),
                        ),
                        _ => unreachable!("kind checked above"),
                    });
                if pending_dirty {
                    self.mark_as_dirty(UpdateOptions::default());
                }
                if pending_touched {
                    self.mark_as_touched(UpdateOptions::default());
                }
                if pending_change {
                    self.leaf_commit_value(
                        pending_value,
                        SetValueOptions {
                            update: UpdateOptions::self_only(),
                            emit_model_to_view: false,
                            emit_view_to_model: true,
                        },
                    );
                    return true;
                }
                false
            }
            ControlKind::Group | ControlKind::Array => {
                let mut updated = false;
                for child in self.children() {
                    updated |= child.sync_pending_controls();
                }
                if updated {
                    self.update_value_and_validity(UpdateOptions::self_only());
                }
                updated
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Kind-dispatched value writes
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Write a value, dispatching on node kind.
    ///
    /// Strict for groups/arrays: the supplied value must correspond
    /// exactly to the child collection (see [`FormError`]). Infallible
    /// for leaves.
    pub fn set_value(&self, value: Value, opts: UpdateOptions) -> Result<(), FormError> {
        match self.kind() {
            ControlKind::Leaf => {
                self.leaf_set_value(value, SetValueOptions::from(opts));
                Ok(())
            }
            ControlKind::Group => self.group_set_value(value, opts),
            ControlKind::Array => self.array_set_value(value, opts),
        }
    }

    /// Patch a value leniently: only matching keys/indices are
    /// touched, `Null` for a whole group/array is a no-op.
    pub fn patch_value(&self, value: Value, opts: UpdateOptions) {
        match self.kind() {
            ControlKind::Leaf => self.leaf_set_value(value, SetValueOptions::from(opts)),
            ControlKind::Group => self.group_patch_value(value, opts),
            ControlKind::Array => self.array_patch_value(value, opts),
        }
    }

    /// Reset to the default state: leaves reapply their default value,
    /// groups/arrays reset every child; everything becomes pristine and
    /// untouched.
    pub fn reset(&self, opts: UpdateOptions) {
        self.reset_opt(None, opts);
    }

    /// Reset with explicit per-node values (group entries / array
    /// items address children; missing entries fall back to child
    /// defaults).
    pub fn reset_to(&self, value: Value, opts: UpdateOptions) {
        self.reset_opt(Some(value), opts);
    }

    pub(crate) fn reset_opt(&self, value: Option<Value>, opts: UpdateOptions) {
        match self.kind() {
            ControlKind::Leaf => self.leaf_reset_opt(value.map(Into::into), opts),
            ControlKind::Group => self.group_reset_opt(value, opts),
            ControlKind::Array => self.array_reset_opt(value, opts),
        }
    }
}

// ---------------------------------------------------------------------------
// Parent/child wiring
// ---------------------------------------------------------------------------

impl ControlRef {
    /// Replace the single-slot structural-change listener.
    ///
    /// A control attached as a child has this slot occupied by its
    /// owning collection; registering here is meaningful for root
    /// controls (hosts re-sync bindings on structural changes).
    pub fn register_on_collection_change(&self, callback: Option<Rc<dyn Fn()>>) {
        self.with_mut(|n| n.on_collection_change = callback);
    }

    pub(crate) fn notify_collection_changed(&self) {
        if let Some(callback) = self.with(|n| n.on_collection_change.clone()) {
            callback();
        }
    }

    /// Wire `child` under `self`: parent pointer plus the bubble-up
    /// collection-change closure. Fails when the child is already
    /// attached elsewhere (detach first).
    pub(crate) fn attach_child(&self, child: &ControlRef) -> Result<(), FormError> {
        if child.with(|n| n.parent.is_some()) {
            return Err(FormError::AlreadyAttached);
        }
        debug_assert!(
            {
                let mut ancestor = Some(self.clone());
                let mut ok = true;
                while let Some(a) = ancestor {
                    if ControlRef::ptr_eq(&a, child) {
                        ok = false;
                        break;
                    }
                    ancestor = a.parent();
                }
                ok
            },
            "attaching an ancestor as a child would create a cycle"
        );
        child.with_mut(|n| n.parent = Some(self.downgrade()));
        let weak = self.downgrade();
        child.with_mut(|n| {
            n.on_collection_change = Some(Rc::new(move || {
                if let Some(parent) = weak.upgrade() {
                    parent.notify_collection_changed();
                }
            }));
        });
        Ok(())
    }

    /// Constructor-time wiring: children handed to a constructor are
    /// required to be unattached.
    pub(crate) fn wire_child(&self, child: &ControlRef) {
        debug_assert!(
            child.with(|n| n.parent.is_none()),
            "constructor children must be unattached"
        );
        let _ = self.attach_child(child);
    }

    /// Sever `child`'s upward wiring (parent pointer and collection
    /// slot).
    pub(crate) fn detach_child(&self, child: &ControlRef) {
        child.with_mut(|n| {
            n.parent = None;
            n.on_collection_change = None;
        });
    }
}

// ---------------------------------------------------------------------------
// Downcasts
// ---------------------------------------------------------------------------

impl ControlRef {
    /// View this node as a leaf, when it is one.
    #[must_use]
    pub fn as_leaf(&self) -> Option<crate::control::FormControl> {
        (self.kind() == ControlKind::Leaf).then(|| crate::control::FormControl::from_ref(self.clone()))
    }

    /// View this node as a keyed group, when it is one.
    #[must_use]
    pub fn as_group(&self) -> Option<crate::control::FormGroup> {
        (self.kind() == ControlKind::Group).then(|| crate::control::FormGroup::from_ref(self.clone()))
    }

    /// View this node as an indexed group, when it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<crate::control::FormArray> {
        (self.kind() == ControlKind::Array).then(|| crate::control::FormArray::from_ref(self.clone()))
    }
}

// Leaf internals referenced by the dispatchers above live in leaf.rs;
// this helper exposes leaf state access to sibling modules.
impl ControlRef {
    pub(crate) fn with_leaf<R>(&self, f: impl FnOnce(&mut LeafState) -> R) -> R {
        self.with_mut(|n| match &mut n.kind {
            NodeKind::Leaf(leaf) => f(leaf),
            _ => panic!("not a leaf control"),
        })
    }
}
