//! # DeCAI Common
//!
//! Shared primitives for the DeCAI incentive simulation.
//!
//! ## Core Types
//!
//! - [`Address`]: Opaque identifier of a party that can hold value
//! - [`Msg`]: Sender plus value attached to a single contract call
//! - [`Balances`]: Address → balance ledger used by the simulation driver
//! - [`Clock`]: Explicitly advanced logical time source (seconds)
//! - [`ClaimWindow`]: A delay measured from submission that may be disabled
//! - [`SmartContract`]: Address/owner bookkeeping shared by every contract
//!
//! ## Errors
//!
//! - [`MechanismError`]: Rejections raised by incentive mechanisms
//! - [`LedgerError`]: Balance transfer failures
//! - [`DecaiError`]: Umbrella error with `From` conversions for both

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{DecaiError, LedgerError, MechanismError, Result};
pub use types::{
    address::{Address, Msg},
    balances::Balances,
    clock::{ClaimWindow, Clock, Timestamp},
    contract::SmartContract,
};

/// DeCAI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One hour in seconds
pub const HOUR_S: u64 = 60 * 60;

/// One day in seconds
pub const DAY_S: u64 = 24 * HOUR_S;

/// Default wait before a contributor may ask for a refund
pub const DEFAULT_REFUND_TIME_S: u64 = DAY_S;

/// Default wait before any address may claim a remaining deposit
pub const DEFAULT_ANY_ADDRESS_CLAIM_WAIT_TIME_S: u64 = 7 * DAY_S;
