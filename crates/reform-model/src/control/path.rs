#![forbid(unsafe_code)]

//! Dot-path descent into the tree and path-aware error queries.

use reform_core::Value;

use crate::control::base::ControlRef;
use crate::control::node::NodeKind;

impl ControlRef {
    /// Walk a dot-separated path of group names and array indices
    /// (`"addresses.0.city"`). Returns `None` for any segment that does
    /// not resolve: unknown name, non-numeric or out-of-range index, or
    /// descent into a leaf.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ControlRef> {
        if path.is_empty() {
            return None;
        }
        let mut current = self.clone();
        for segment in path.split('.') {
            let next = current.with(|n| match &n.kind {
                NodeKind::Leaf(_) => None,
                NodeKind::Group(g) => g.get(segment).cloned(),
                NodeKind::Array(a) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| a.children.get(index).cloned()),
            });
            current = next?;
        }
        Some(current)
    }

    /// The error detail for `code` on this control, or on the control
    /// at `path` when given. `None` when the target does not exist or
    /// does not carry that error.
    #[must_use]
    pub fn get_error(&self, code: &str, path: Option<&str>) -> Option<Value> {
        let target = match path {
            Some(path) => self.get(path)?,
            None => self.clone(),
        };
        target
            .errors()
            .and_then(|errors| errors.get(code).cloned())
    }

    /// Whether `code` is present on this control (or the one at `path`).
    #[must_use]
    pub fn has_error(&self, code: &str, path: Option<&str>) -> bool {
        self.get_error(code, path).is_some()
    }
}
