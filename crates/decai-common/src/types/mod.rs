//! Core data types for the DeCAI simulation

pub mod address;
pub mod balances;
pub mod clock;
pub mod contract;
