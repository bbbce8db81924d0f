//! The incentive mechanism contract surface
//!
//! Every mechanism exposes the same four operations to the driver:
//! - `handle_add_data`: accept or reject a submission, and price it
//! - `handle_refund`: return (part of) a deposit to its contributor
//! - `handle_report`: reward another party for flagging stored data
//! - `distribute_payment_for_prediction`: share fees paid to query the model
//!
//! Variants differ only in their formulas. Window checks, clamping and the
//! conservation bookkeeping live in [`DepositLedger`].

use decai_common::{Address, ClaimWindow, MechanismError, SmartContract};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::DepositLedger;
use crate::prediction::Prediction;
use crate::stored_data::{DataKey, Label, Sample, StoredData};

/// The two claim windows, both measured from a record's submission time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanismConfig {
    /// Earliest time the contributor may reclaim the remaining deposit
    pub refund_time_s: ClaimWindow,
    /// Earliest time any other address may claim the remaining deposit
    pub any_address_claim_wait_time_s: ClaimWindow,
}

impl MechanismConfig {
    pub fn new(refund_time_s: ClaimWindow, any_address_claim_wait_time_s: ClaimWindow) -> Self {
        Self {
            refund_time_s,
            any_address_claim_wait_time_s,
        }
    }

    /// Both windows in seconds
    pub fn after(refund_time_s: u64, any_address_claim_wait_time_s: u64) -> Self {
        Self::new(
            ClaimWindow::After(refund_time_s),
            ClaimWindow::After(any_address_claim_wait_time_s),
        )
    }

    /// The outside-claim window may not open before the refund window,
    /// otherwise others could front-run the contributor.
    pub fn validate(&self) -> Result<(), MechanismError> {
        if self.any_address_claim_wait_time_s < self.refund_time_s {
            return Err(MechanismError::InvalidConfiguration(format!(
                "any_address_claim_wait_time_s ({}) must not be shorter than refund_time_s ({})",
                self.any_address_claim_wait_time_s, self.refund_time_s
            )));
        }
        Ok(())
    }
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDataOutcome {
    /// Key of the persisted record
    pub key: DataKey,
    /// Amount taken into custody; never more than the message value
    pub cost: Decimal,
    /// Whether the model should learn from the sample now
    pub update_model: bool,
}

/// Value a mechanism pays out immediately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: Address,
    pub amount: Decimal,
}

/// What happens to fees paid for predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDistribution {
    /// Keep the fee in an unallocated pool
    #[default]
    Retain,
    /// Credit contributors pro-rata to their remaining deposits;
    /// credit is withdrawn with `claim_prediction_fees`
    ProRataCredit,
    /// Pay contributors pro-rata to their remaining deposits right away
    ProRataImmediate,
}

/// Incentive mechanism contract
pub trait IncentiveMechanism {
    /// Address and owner of this contract
    fn contract(&self) -> &SmartContract;

    /// Records, windows and custody totals
    fn ledger(&self) -> &DepositLedger;

    fn config(&self) -> &MechanismConfig {
        self.ledger().config()
    }

    fn stored_data(&self, key: &DataKey) -> Option<&StoredData> {
        self.ledger().registry().get(key)
    }

    /// Determine if a request to add data is acceptable and what it costs.
    ///
    /// On acceptance a record is persisted with `deposit = cost`.
    fn handle_add_data(
        &mut self,
        contributor: &Address,
        msg_value: Decimal,
        data: &Sample,
        classification: Label,
    ) -> Result<AddDataOutcome, MechanismError>;

    /// Amount to refund to `submitter`, at most
    /// `min(claimable_amount, remaining_deposit)`.
    fn handle_refund(
        &mut self,
        submitter: &Address,
        key: &DataKey,
        claimable_amount: Decimal,
        claimed_by_submitter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError>;

    /// Amount to reward `reporter` for flagging the data, at most the
    /// remaining deposit.
    fn handle_report(
        &mut self,
        reporter: &Address,
        key: &DataKey,
        claimed_by_reporter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError>;

    /// Share `value` paid by `sender` to call the model.
    ///
    /// Returns the payouts the caller must make now; anything not returned
    /// stays in custody.
    fn distribute_payment_for_prediction(
        &mut self,
        sender: &Address,
        value: Decimal,
    ) -> Result<Vec<Payout>, MechanismError>;

    /// Withdraw prediction fees credited to `address`
    fn claim_prediction_fees(&mut self, address: &Address) -> Decimal;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_disabled() {
        let config = MechanismConfig::default();
        assert_eq!(config.refund_time_s, ClaimWindow::Never);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_window_order() {
        assert!(MechanismConfig::after(3600, 7200).validate().is_ok());
        assert!(MechanismConfig::after(3600, 3600).validate().is_ok());

        let err = MechanismConfig::after(7200, 3600).validate().unwrap_err();
        assert!(matches!(err, MechanismError::InvalidConfiguration(_)));

        let refunds_never = MechanismConfig::new(ClaimWindow::Never, ClaimWindow::After(10));
        assert!(refunds_never.validate().is_err());
    }

    #[test]
    fn test_config_deserialize() {
        let config: MechanismConfig =
            serde_json::from_str(r#"{"refund_time_s": {"after": 60}}"#).unwrap();
        assert_eq!(config.refund_time_s, ClaimWindow::After(60));
        assert_eq!(config.any_address_claim_wait_time_s, ClaimWindow::Never);
    }
}
