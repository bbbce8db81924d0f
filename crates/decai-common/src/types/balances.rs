//! Balances - value held by every address in a simulation run
//!
//! Key characteristics:
//! - Transfers never create or destroy value; `total()` is constant after
//!   initialization
//! - Zero-value transfers are accepted and do nothing
//! - An address that was never initialized has no balance entry

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::types::address::Address;

/// Address → balance ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balances {
    balances: BTreeMap<Address, Decimal>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting balance for `address`
    pub fn initialize(&mut self, address: Address, start_balance: Decimal) -> Result<(), LedgerError> {
        if start_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeValue(start_balance));
        }
        self.balances.insert(address, start_balance);
        Ok(())
    }

    /// Current balance, zero for unknown addresses
    pub fn get(&self, address: &Address) -> Decimal {
        self.balances.get(address).copied().unwrap_or(Decimal::ZERO)
    }

    /// Whether `address` has a balance entry
    pub fn contains(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }

    /// Check `address` can pay `amount`
    pub fn ensure_available(&self, address: &Address, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeValue(amount));
        }
        let available = self
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAddress(address.to_string()))?;
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                address: address.to_string(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Move `amount` from `sender` to `receiver`
    ///
    /// The receiver gets an entry if it had none.
    pub fn send(&mut self, sender: &Address, receiver: &Address, amount: Decimal) -> Result<(), LedgerError> {
        self.ensure_available(sender, amount)?;
        if amount.is_zero() {
            return Ok(());
        }

        if let Some(balance) = self.balances.get_mut(sender) {
            *balance -= amount;
        }
        *self.balances.entry(receiver.clone()).or_insert(Decimal::ZERO) += amount;

        debug!(%sender, %receiver, %amount, "Transferred value");
        Ok(())
    }

    /// Sum over every address
    pub fn total(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    /// Iterate over `(address, balance)` pairs in address order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Decimal)> {
        self.balances.iter()
    }
}
