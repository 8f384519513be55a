#![forbid(unsafe_code)]

//! The indexed group: children addressed positionally.

use std::ops::Deref;

use reform_core::{FormError, Value};
use tracing::debug;

use crate::control::base::ControlRef;
use crate::control::node::{ArrayState, Node, NodeKind, ValidatorState};
use crate::options::{ControlOptions, UpdateOptions};

/// An inner node whose children are addressed by index.
///
/// The aggregate value is a [`Value::List`] of enabled children's
/// values (all children once the array itself is disabled). Derefs to
/// [`ControlRef`] for the shared API.
#[derive(Clone)]
pub struct FormArray {
    inner: ControlRef,
}

impl Deref for FormArray {
    type Target = ControlRef;

    fn deref(&self) -> &ControlRef {
        &self.inner
    }
}

impl std::fmt::Debug for FormArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormArray")
            .field("status", &self.status())
            .field("value", &self.value())
            .finish()
    }
}

impl From<FormArray> for ControlRef {
    fn from(array: FormArray) -> Self {
        array.inner
    }
}

impl From<&FormArray> for ControlRef {
    fn from(array: &FormArray) -> Self {
        array.inner.clone()
    }
}

impl FormArray {
    /// An array over the given children, with no validators.
    pub fn new<C>(children: impl IntoIterator<Item = C>) -> Self
    where
        C: Into<ControlRef>,
    {
        Self::with_options(children, ControlOptions::default())
    }

    /// An array over the given children and construction options.
    ///
    /// Children must be unattached; handing the same control to two
    /// collections is a construction bug.
    pub fn with_options<C>(
        children: impl IntoIterator<Item = C>,
        options: ControlOptions,
    ) -> Self
    where
        C: Into<ControlRef>,
    {
        let children: Vec<ControlRef> = children.into_iter().map(Into::into).collect();
        let validators = ValidatorState::new(options.validators, options.async_validators);
        let has_async = validators.has_async();
        let node = Node::new(
            NodeKind::Array(ArrayState {
                children: children.clone(),
            }),
            Value::Null,
            validators,
            options.update_on,
        );
        let array = Self {
            inner: ControlRef::from_node(node),
        };
        for child in &children {
            array.inner.wire_child(child);
        }
        array
            .inner
            .update_value_and_validity(UpdateOptions {
                only_self: true,
                emit_event: has_async,
            });
        array
    }

    pub(crate) fn from_ref(inner: ControlRef) -> Self {
        Self { inner }
    }

    /// The child at `index`, if in range.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<ControlRef> {
        self.inner.with(|n| match &n.kind {
            NodeKind::Array(a) => a.children.get(index).cloned(),
            _ => None,
        })
    }

    /// Snapshot of the children in positional order.
    #[must_use]
    pub fn controls(&self) -> Vec<ControlRef> {
        self.inner.with(|n| match &n.kind {
            NodeKind::Array(a) => a.children.clone(),
            _ => Vec::new(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.with(|n| match &n.kind {
            NodeKind::Array(a) => a.children.len(),
            _ => 0,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a child, revalidate, and fire the structural-change
    /// notification.
    pub fn push(&self, control: impl Into<ControlRef>, opts: UpdateOptions) -> Result<(), FormError> {
        let control: ControlRef = control.into();
        debug!("push");
        self.inner.attach_child(&control)?;
        self.inner.with_mut(|n| {
            if let NodeKind::Array(a) = &mut n.kind {
                a.children.push(control.clone());
            }
        });
        self.inner.update_value_and_validity(opts);
        self.inner.notify_collection_changed();
        Ok(())
    }

    /// Insert a child at `index` (clamped to the current length) and
    /// revalidate.
    pub fn insert(
        &self,
        index: usize,
        control: impl Into<ControlRef>,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let control: ControlRef = control.into();
        self.inner.attach_child(&control)?;
        self.inner.with_mut(|n| {
            if let NodeKind::Array(a) = &mut n.kind {
                let index = index.min(a.children.len());
                a.children.insert(index, control.clone());
            }
        });
        self.inner.update_value_and_validity(opts);
        Ok(())
    }

    /// Remove the child at `index` (no-op when out of range) and
    /// revalidate. Like [`insert`](Self::insert), this does not fire
    /// the structural-change notification.
    pub fn remove_at(&self, index: usize, opts: UpdateOptions) {
        debug!(index, "remove_at");
        let removed = self.inner.with_mut(|n| match &mut n.kind {
            NodeKind::Array(a) if index < a.children.len() => Some(a.children.remove(index)),
            _ => None,
        });
        if let Some(child) = removed {
            self.inner.detach_child(&child);
        }
        self.inner.update_value_and_validity(opts);
    }

    /// Replace the child at `index` (clamped: past-the-end appends),
    /// revalidate, and fire the structural-change notification.
    pub fn set_control(
        &self,
        index: usize,
        control: impl Into<ControlRef>,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let control: ControlRef = control.into();
        self.inner.attach_child(&control)?;
        let removed = self.inner.with_mut(|n| match &mut n.kind {
            NodeKind::Array(a) => {
                let old = (index < a.children.len()).then(|| a.children.remove(index));
                let index = index.min(a.children.len());
                a.children.insert(index, control.clone());
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

    /// Remove every child and revalidate. A no-op (no events) when
    /// already empty.
    pub fn clear(&self, opts: UpdateOptions) {
        if self.is_empty() {
            return;
        }
        let children = self.inner.with_mut(|n| match &mut n.kind {
            NodeKind::Array(a) => std::mem::take(&mut a.children),
            _ => Vec::new(),
        });
        for child in &children {
            self.inner.detach_child(child);
        }
        self.inner.update_value_and_validity(opts);
    }
}

// ---------------------------------------------------------------------------
// Array internals shared with the dispatchers in base.rs
// ---------------------------------------------------------------------------

impl ControlRef {
    fn array_children(&self) -> Vec<ControlRef> {
        self.with(|n| match &n.kind {
            NodeKind::Array(a) => a.children.clone(),
            _ => Vec::new(),
        })
    }

    /// Strict write: the list must match the children one-to-one.
    pub(crate) fn array_set_value(
        &self,
        value: Value,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let children = self.array_children();
        if children.is_empty() {
            return Err(FormError::NoControls { kind: "array" });
        }
        let items = match &value {
            Value::List(items) => items.clone(),
            _ => Vec::new(),
        };
        if items.len() > children.len() {
            return Err(FormError::MissingControl {
                key: children.len().to_string(),
            });
        }
        if items.len() < children.len() {
            return Err(FormError::MissingControlValue {
                key: items.len().to_string(),
            });
        }
        for (child, item) in children.iter().zip(items) {
            child.set_value(
                item,
                UpdateOptions {
                    only_self: true,
                    emit_event: opts.emit_event,
                },
            )?;
        }
        self.mark_as_dirty(opts);
        self.update_value_and_validity(opts);
        Ok(())
    }

    /// Lenient write: extra items are ignored, children past the list's
    /// end keep their value, `Null` for the whole array is a no-op.
    pub(crate) fn array_patch_value(&self, value: Value, opts: UpdateOptions) {
        let items = match value {
            Value::Null => return,
            Value::List(items) => items,
            _ => Vec::new(),
        };
        let children = self.array_children();
        let mut patched = false;
        for (child, item) in children.iter().zip(items) {
            child.patch_value(
                item,
                UpdateOptions {
                    only_self: true,
                    emit_event: opts.emit_event,
                },
            );
            patched = true;
        }
        if patched {
            self.mark_as_dirty(opts);
        }
        self.update_value_and_validity(opts);
    }

    pub(crate) fn array_reset_opt(&self, value: Option<Value>, opts: UpdateOptions) {
        for (index, child) in self.array_children().iter().enumerate() {
            let child_state = value.as_ref().and_then(|v| v.at(index)).cloned();
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
