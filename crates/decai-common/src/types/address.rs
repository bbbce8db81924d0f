//! Address and Msg - value-transfer primitives
//!
//! An [`Address`] identifies any party that can hold value: agents, the
//! incentive mechanism itself, or the model owner. A [`Msg`] is what a
//! caller attaches to a single contract call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Opaque party identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A message sent to a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    /// The sender's address
    pub sender: Address,
    /// Amount sent with the message
    pub value: Decimal,
}

impl Msg {
    /// Create a message, rejecting negative values
    pub fn new(sender: impl Into<Address>, value: Decimal) -> Result<Self, LedgerError> {
        if value < Decimal::ZERO {
            return Err(LedgerError::NegativeValue(value));
        }
        Ok(Self {
            sender: sender.into(),
            value,
        })
    }

    /// A message that carries no value
    pub fn free(sender: impl Into<Address>) -> Self {
        Self {
            sender: sender.into(),
            value: Decimal::ZERO,
        }
    }
}
