// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One labelled row of a tabular dataset. The `row` index is the
// zero-based data row in the source file (header excluded) and
// serves as the row identity when checking split membership.

use serde::{Deserialize, Serialize};

/// Binary class of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    /// Build a label from its numeric form. Only 0 and 1 are valid.
    pub fn from_index(value: i64) -> Option<Self> {
        match value {
            0 => Some(Label::Negative),
            1 => Some(Label::Positive),
            _ => None,
        }
    }

    /// Threshold a probability: strictly above `threshold` is positive.
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        if probability > threshold {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    pub fn index(self) -> usize {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    /// Class name as printed in the classification report.
    pub fn name(self) -> &'static str {
        match self {
            Label::Negative => "0",
            Label::Positive => "1",
        }
    }
}

/// A labelled text sample. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Data-row index within the source file
    pub row: usize,
    /// Raw text, never null (may be empty)
    pub text: String,
    pub label: Label,
}

impl Sample {
    pub fn new(row: usize, text: impl Into<String>, label: Label) -> Self {
        Self {
            row,
            text: text.into(),
            label,
        }
    }
}
