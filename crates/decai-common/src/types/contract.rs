//! SmartContract - identity shared by every simulated contract
//!
//! Purely bookkeeping: the address is where the driver sends value owed to
//! the contract, the owner is informational. Neither is a security boundary.

use serde::{Deserialize, Serialize};

use crate::types::address::Address;

/// Address and optional owner of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContract {
    /// The address of this contract, stable for its lifetime
    pub address: Address,
    /// The owner of this contract
    pub owner: Option<Address>,
}

impl SmartContract {
    /// Derive a fresh address from the contract kind, e.g. `Stakeable-0190...`
    pub fn new(kind: &str) -> Self {
        Self {
            address: Address::new(format!("{}-{}", kind, uuid::Uuid::now_v7())),
            owner: None,
        }
    }
}
