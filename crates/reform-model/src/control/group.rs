#![forbid(unsafe_code)]

//! The keyed group: children addressed by string name.
//!
//! # Invariants
//!
//! A child belongs to at most one parent; the structural operations
//! reject a control that is already attached elsewhere. Removing a
//! child severs its upward wiring, after which it can be re-attached.

use std::ops::Deref;

use reform_core::{FormError, Value};
use tracing::debug;

use crate::control::base::ControlRef;
use crate::control::node::{GroupState, Node, NodeKind, ValidatorState};
use crate::options::{ControlOptions, UpdateOptions};

/// An inner node whose children are addressed by name.
///
/// The aggregate value is a [`Value::Map`] of enabled children's
/// values (all children once the group itself is disabled). Derefs to
/// [`ControlRef`] for the shared API.
#[derive(Clone)]
pub struct FormGroup {
    inner: ControlRef,
}

impl Deref for FormGroup {
    type Target = ControlRef;

    fn deref(&self) -> &ControlRef {
        &self.inner
    }
}

impl std::fmt::Debug for FormGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormGroup")
            .field("status", &self.status())
            .field("value", &self.value())
            .finish()
    }
}

impl From<FormGroup> for ControlRef {
    fn from(group: FormGroup) -> Self {
        group.inner
    }
}

impl From<&FormGroup> for ControlRef {
    fn from(group: &FormGroup) -> Self {
        group.inner.clone()
    }
}

impl FormGroup {
    /// A group over the given named children, with no validators.
    pub fn new<K, C>(children: impl IntoIterator<Item = (K, C)>) -> Self
    where
        K: Into<String>,
        C: Into<ControlRef>,
    {
        Self::with_options(children, ControlOptions::default())
    }

    /// A group over the given named children and construction options.
    ///
    /// Children must be unattached; handing the same control to two
    /// collections is a construction bug.
    pub fn with_options<K, C>(
        children: impl IntoIterator<Item = (K, C)>,
        options: ControlOptions,
    ) -> Self
    where
        K: Into<String>,
        C: Into<ControlRef>,
    {
        let children: Vec<(String, ControlRef)> = children
            .into_iter()
            .map(|(name, child)| (name.into(), child.into()))
            .collect();
        let validators = ValidatorState::new(options.validators, options.async_validators);
        let has_async = validators.has_async();
        let node = Node::new(
            NodeKind::Group(GroupState {
                children: children.clone(),
            }),
            Value::Null,
            validators,
            options.update_on,
        );
        let group = Self {
            inner: ControlRef::from_node(node),
        };
        for (_, child) in &children {
            group.inner.wire_child(child);
        }
        group
            .inner
            .update_value_and_validity(UpdateOptions {
                only_self: true,
                emit_event: has_async,
            });
        group
    }

    pub(crate) fn from_ref(inner: ControlRef) -> Self {
        Self { inner }
    }

    /// The child registered under `name`, if any.
    #[must_use]
    pub fn control(&self, name: &str) -> Option<ControlRef> {
        self.inner.with(|n| match &n.kind {
            NodeKind::Group(g) => g.get(name).cloned(),
            _ => None,
        })
    }

    /// Snapshot of the named children in registration order.
    #[must_use]
    pub fn controls(&self) -> Vec<(String, ControlRef)> {
        self.inner.with(|n| match &n.kind {
            NodeKind::Group(g) => g.children.clone(),
            _ => Vec::new(),
        })
    }

    /// Whether an *enabled* child is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.control(name).is_some_and(|child| child.enabled())
    }

    /// Register a child without revalidating the group. Returns the
    /// already-registered child when the name is taken.
    ///
    /// Building block for [`add_control`](Self::add_control); use that
    /// unless batching registrations before a single revalidation.
    pub fn register_control(
        &self,
        name: impl Into<String>,
        control: impl Into<ControlRef>,
    ) -> Result<ControlRef, FormError> {
        let name = name.into();
        if let Some(existing) = self.control(&name) {
            return Ok(existing);
        }
        let control: ControlRef = control.into();
        self.inner.attach_child(&control)?;
        self.inner.with_mut(|n| {
            if let NodeKind::Group(g) = &mut n.kind {
                g.children.push((name, control.clone()));
            }
        });
        Ok(control)
    }

    /// Add a child, revalidate, and fire the structural-change
    /// notification. A taken name leaves the existing child in place.
    pub fn add_control(
        &self,
        name: impl Into<String>,
        control: impl Into<ControlRef>,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let name = name.into();
        debug!(name = %name, "add_control");
        self.register_control(name, control)?;
        self.inner.update_value_and_validity(opts);
        self.inner.notify_collection_changed();
        Ok(())
    }

    /// Remove the child under `name` (no-op name otherwise), revalidate,
    /// and fire the structural-change notification.
    pub fn remove_control(&self, name: &str, opts: UpdateOptions) {
        debug!(name = %name, "remove_control");
        let removed = self.inner.with_mut(|n| match &mut n.kind {
            NodeKind::Group(g) => {
                let position = g.children.iter().position(|(key, _)| key == name);
                position.map(|index| g.children.remove(index).1)
            }
            _ => None,
        });
        if let Some(child) = removed {
            self.inner.detach_child(&child);
        }
        self.inner.update_value_and_validity(opts);
        self.inner.notify_collection_changed();
    }

    /// Replace (or add) the child under `name`, revalidate, and fire
    /// the structural-change notification. The new child lands at the
    /// end of registration order.
    pub fn set_control(
        &self,
        name: impl Into<String>,
        control: impl Into<ControlRef>,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let name = name.into();
        let control: ControlRef = control.into();
        self.inner.attach_child(&control)?;
        let removed = self.inner.with_mut(|n| match &mut n.kind {
            NodeKind::Group(g) => {
                let position = g.children.iter().position(|(key, _)| key == &name);
                let old = position.map(|index| g.children.remove(index).1);
                g.children.push((name, control.clone()));
                old
            }
            _ => None,
        });
        if let Some(old) = removed {
            self.inner.detach_child(&old);
        }
        self.inner.update_value_and_validity(opts);
        self.inner.notify_collection_changed();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Group internals shared with the dispatchers in base.rs
// ---------------------------------------------------------------------------

impl ControlRef {
    fn group_children(&self) -> Vec<(String, ControlRef)> {
        self.with(|n| match &n.kind {
            NodeKind::Group(g) => g.children.clone(),
            _ => Vec::new(),
        })
    }

    /// Strict write: the map must name exactly the registered children.
    pub(crate) fn group_set_value(
        &self,
        value: Value,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let entries = self.group_children();
        if entries.is_empty() {
            return Err(FormError::NoControls { kind: "group" });
        }
        let map = match &value {
            Value::Map(m) => m.clone(),
            _ => Default::default(),
        };
        for key in map.keys() {
            if !entries.iter().any(|(name, _)| name == key) {
                return Err(FormError::MissingControl { key: key.clone() });
            }
        }
        for (name, _) in &entries {
            if !map.contains_key(name) {
                return Err(FormError::MissingControlValue { key: name.clone() });
            }
        }
        for (name, child) in &entries {
            if let Some(item) = map.get(name) {
                child.set_value(
                    item.clone(),
                    UpdateOptions {
                        only_self: true,
                        emit_event: opts.emit_event,
                    },
                )?;
            }
        }
        self.mark_as_dirty(opts);
        self.update_value_and_validity(opts);
        Ok(())
    }

    /// Lenient write: unknown keys are ignored, missing children keep
    /// their value, `Null` for the whole group is a no-op.
    pub(crate) fn group_patch_value(&self, value: Value, opts: UpdateOptions) {
        let map = match value {
            Value::Null => return,
            Value::Map(m) => m,
            _ => Default::default(),
        };
        let mut patched = false;
        for (key, item) in map {
            if let Some(child) = self.with(|n| match &n.kind {
                NodeKind::Group(g) => g.get(&key).cloned(),
                _ => None,
            }) {
                child.patch_value(
                    item,
                    UpdateOptions {
                        only_self: true,
                        emit_event: opts.emit_event,
                    },
                );
                patched = true;
            }
        }
        if patched {
            self.mark_as_dirty(opts);
        }
        self.update_value_and_validity(opts);
    }

    pub(crate) fn group_reset_opt(&self, value: Option<Value>, opts: UpdateOptions) {
        for (name, child) in self.group_children() {
            let child_state = value.as_ref().and_then(|v| v.get(&name)).cloned();
            child.reset_opt(
                child_state,
                UpdateOptions {
                    only_self: true,
                    emit_event: opts.emit_event,
                },
            );
        }
        self.update_pristine(opts);
        self.update_touched(opts);
        self.update_value_and_validity(opts);
    }
}
