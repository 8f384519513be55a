//! Control validity status.

use std::fmt;

/// The validity state of a control node.
///
/// Exactly one status holds at any time; it is recomputed by the
/// propagation engine and never set directly except through
/// `disable`/`enable`/`mark_as_pending`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ControlStatus {
    /// Every validator passed and no async validation is in flight.
    Valid,
    /// A local validator failed, or an enabled descendant is invalid.
    Invalid,
    /// Async validation is in flight here or on an enabled descendant.
    Pending,
    /// Exempt from validation and excluded from ancestor aggregate
    /// values.
    Disabled,
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlStatus::Valid => "VALID",
            ControlStatus::Invalid => "INVALID",
            ControlStatus::Pending => "PENDING",
            ControlStatus::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}
