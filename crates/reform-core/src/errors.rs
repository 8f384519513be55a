//! Validation errors and contract violations.
//!
//! Two very different failure kinds live here, and keeping them apart
//! is part of the design:
//!
//! - [`ValidationErrors`]: the routine, fully recoverable outcome of a
//!   validator rejecting a value. Stored on the control as state, never
//!   returned as `Err`.
//! - [`FormError`]: a violated API contract (strict `set_value` against
//!   a mismatched shape, attaching an already-attached child). Returned
//!   as `Err` from the mutation call site and never caught inside the
//!   engine.

use std::collections::BTreeMap;

use crate::value::Value;

/// A map from error code to arbitrary error detail.
///
/// Produced by validator functions; an empty map is never stored (a
/// passing validator reports `None` instead).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ValidationErrors(BTreeMap<String, Value>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry convenience constructor.
    pub fn single(code: impl Into<String>, detail: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(code.into(), detail.into());
        Self(map)
    }

    pub fn insert(&mut self, code: impl Into<String>, detail: impl Into<Value>) {
        self.0.insert(code.into(), detail.into());
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Value> {
        self.0.get(code)
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge `other` into `self`; on code collision the entry from
    /// `other` wins (later validators override earlier ones).
    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Merge a sequence of optional error maps into one, returning
    /// `None` when every input passed.
    #[must_use]
    pub fn merge_all<I>(results: I) -> Option<ValidationErrors>
    where
        I: IntoIterator<Item = Option<ValidationErrors>>,
    {
        let mut merged: Option<ValidationErrors> = None;
        for errors in results.into_iter().flatten() {
            merged.get_or_insert_with(ValidationErrors::new).merge(errors);
        }
        merged
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build a [`ValidationErrors`] map from `code => detail` pairs.
///
/// # Examples
///
/// ```
/// use reform_core::errors;
///
/// let errs = errors! { "required" => true };
/// assert!(errs.contains("required"));
/// ```
#[macro_export]
macro_rules! errors {
    ($($code:expr => $detail:expr),* $(,)?) => {{
        let mut map = $crate::ValidationErrors::new();
        $(map.insert($code, $detail);)*
        map
    }};
}

/// A violated programming contract on the form API.
///
/// Strict writes (`set_value` on a group/array) promise a total,
/// order-preserving correspondence between the supplied value and the
/// child collection; these errors report the ways that promise can be
/// broken. `AlreadyAttached` guards the single-parent invariant.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    /// `set_value` was called on a group/array with zero children.
    #[error("cannot set value on a {kind} with no child controls")]
    NoControls {
        /// `"group"` or `"array"`.
        kind: &'static str,
    },
    /// The supplied value names a child that does not exist.
    #[error("cannot find control with name or index '{key}'")]
    MissingControl { key: String },
    /// The supplied value omits an entry for an existing child.
    #[error("must supply a value for control with name or index '{key}'")]
    MissingControlValue { key: String },
    /// The child is already attached to another parent. Detach it
    /// (remove it from its current owner) before re-attaching.
    #[error("control is already attached to a parent")]
    AlreadyAttached,
}
