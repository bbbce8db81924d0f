//! Prediction - the model's current label for a stored sample
//!
//! Running the model can be the most expensive part of a refund or report,
//! so callers may pass a deferred accessor instead of a value. Policies only
//! resolve it on the branch that compares the prediction with the label.

use crate::stored_data::Label;

/// Either a known label or a closure that computes it on demand
pub enum Prediction<'a> {
    Value(Label),
    Deferred(Box<dyn FnOnce() -> Label + 'a>),
}

impl<'a> Prediction<'a> {
    pub fn deferred(f: impl FnOnce() -> Label + 'a) -> Self {
        Prediction::Deferred(Box::new(f))
    }

    /// Evaluate the prediction, running the model if needed
    pub fn resolve(self) -> Label {
        match self {
            Prediction::Value(label) => label,
            Prediction::Deferred(f) => f(),
        }
    }

    /// Whether the model agrees with `label`
    pub fn agrees_with(self, label: Label) -> bool {
        self.resolve() == label
    }
}

impl From<Label> for Prediction<'_> {
    fn from(label: Label) -> Self {
        Prediction::Value(label)
    }
}

impl std::fmt::Debug for Prediction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prediction::Value(label) => f.debug_tuple("Value").field(label).finish(),
            Prediction::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
