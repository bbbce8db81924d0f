//! Error types for the DeCAI simulation
//!
//! Provides a unified error type and domain-specific error variants

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::clock::Timestamp;

/// Result type alias using DecaiError
pub type Result<T> = std::result::Result<T, DecaiError>;

/// Unified error type for DeCAI operations
#[derive(Debug, Error)]
pub enum DecaiError {
    // Incentive mechanism rejections
    #[error("Mechanism error: {0}")]
    Mechanism(#[from] MechanismError),

    // Balance ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures raised by an incentive mechanism.
///
/// None of these leave the mechanism mutated: the operation that raised
/// them is rejected as a whole.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MechanismError {
    #[error("Submission rejected: {reason}")]
    RejectedSubmission { reason: String },

    #[error("Too early: now {now}, eligible at {}", fmt_eligible(.eligible_at))]
    TooEarly {
        now: Timestamp,
        /// `None` when the window is disabled
        eligible_at: Option<Timestamp>,
    },

    #[error("{caller} is not allowed to claim data contributed by {contributor}")]
    Unauthorized { caller: String, contributor: String },

    #[error("Deposit already claimed by {claimant}")]
    AlreadyClaimed { claimant: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Payment rejected: {reason}")]
    RejectedPayment { reason: String },

    #[error("No stored data for key {0}")]
    UnknownData(String),
}

fn fmt_eligible(eligible_at: &Option<Timestamp>) -> String {
    match eligible_at {
        Some(t) => t.to_string(),
        None => "never".to_string(),
    }
}

impl MechanismError {
    /// Shorthand for a rejected submission
    pub fn rejected(reason: impl Into<String>) -> Self {
        MechanismError::RejectedSubmission {
            reason: reason.into(),
        }
    }
}

/// Balance ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient balance for {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Value must not be negative: {0}")]
    NegativeValue(Decimal),

    #[error("Unknown address: {0}")]
    UnknownAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = DecaiError::Mechanism(MechanismError::UnknownData("abcd".to_string()));
        assert!(err.to_string().contains("abcd"));
    }

    #[test]
    fn test_too_early_display() {
        let err = MechanismError::TooEarly {
            now: 1800,
            eligible_at: Some(3600),
        };
        assert!(err.to_string().contains("eligible at 3600"));

        let disabled = MechanismError::TooEarly {
            now: 5,
            eligible_at: None,
        };
        assert!(disabled.to_string().contains("never"));
    }

    #[test]
    fn test_variants() {
        let errors = [
            DecaiError::from(MechanismError::rejected("empty sample")),
            DecaiError::from(LedgerError::UnknownAddress("Nobody".to_string())),
            DecaiError::Config("duration_s must be positive".to_string()),
        ];
        for err in &errors {
            let prefix = match err {
                DecaiError::Mechanism(_) => "Mechanism error",
                DecaiError::Ledger(_) => "Ledger error",
                DecaiError::Config(_) => "Configuration error",
            };
            assert!(err.to_string().starts_with(prefix), "{}", err);
        }
    }

    #[test]
    fn test_ledger_error_conversion() {
        let err: DecaiError = LedgerError::NegativeValue(dec!(-1)).into();
        assert!(matches!(err, DecaiError::Ledger(LedgerError::NegativeValue(_))));
    }
}
