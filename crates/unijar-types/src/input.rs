use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one input archive of a merge.
///
/// The `position` is normally the index of the input in the order given by
/// the caller; it must be unique within one merge. The label is for
/// diagnostics (usually the file path).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputId {
    position: usize,
    label: String,
}

impl InputId {
    pub fn new(position: usize, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }

    /// Index of this input in processing order.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Human-readable label (file path or test name).
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputId({}, {:?})", self.position, self.label)
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (input #{})", self.label, self.position)
    }
}
