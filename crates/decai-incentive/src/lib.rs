//! # DeCAI Incentive
//!
//! Incentive mechanisms for collaboratively trained models.
//!
//! Contributors stake deposits when they submit training data. Each
//! mechanism decides what a submission costs, when the deposit can be
//! refunded to its contributor, when anyone else may claim it, and how
//! fees paid to query the model are shared.
//!
//! ## Mechanisms
//!
//! - **Stakeable**: Cost falls with the time since the last update;
//!   refunds require the model to still agree with the label
//! - **Free**: No deposits, nothing to refund or claim
//! - **PooledFee**: Stakes the whole message value; prediction fees are
//!   credited pro-rata to staked deposits
//!
//! ## Conservation
//!
//! ```text
//! Σ remaining_deposit + pooled_fees + Σ credits = received − paid_out
//! ```
//!
//! Every mechanism keeps its value in a [`DepositLedger`], which is the only
//! place value enters or leaves custody.

pub mod ledger;
pub mod mechanism;
pub mod payout;
pub mod policies;
pub mod prediction;
pub mod registry;
pub mod stored_data;

// Re-export the public surface
pub use ledger::DepositLedger;
pub use mechanism::{AddDataOutcome, IncentiveMechanism, MechanismConfig, PaymentDistribution, Payout};
pub use payout::{
    GoodDataTally, PayoutPolicy, PayoutStrategy, RefundContext, RefundRule, ReportContext, ReportRule,
};
pub use policies::{
    free::FreeMechanism,
    pooled::{PooledFee, PooledFeeConfig},
    stakeable::{Stakeable, StakeableConfig},
};
pub use prediction::Prediction;
pub use registry::DataRegistry;
pub use stored_data::{DataKey, Label, Sample, StoredData};
