//! Free - anyone may add data without staking anything
//!
//! Records are still persisted (with a zero deposit) so the driver can look
//! them up, but there is never anything to refund or claim and the model
//! is never consulted. Prediction fees are kept in the pool.

use decai_common::{Address, Clock, MechanismError, SmartContract};
use rust_decimal::Decimal;
use tracing::instrument;

use crate::ledger::DepositLedger;
use crate::mechanism::{AddDataOutcome, IncentiveMechanism, MechanismConfig, PaymentDistribution, Payout};
use crate::prediction::Prediction;
use crate::stored_data::{DataKey, Label, Sample};

/// Deposit-free incentive mechanism
#[derive(Debug)]
pub struct FreeMechanism {
    contract: SmartContract,
    ledger: DepositLedger,
}

impl FreeMechanism {
    /// Windows open immediately so refunds and reports resolve to zero
    pub fn new(clock: Clock) -> Result<Self, MechanismError> {
        Self::with_config(MechanismConfig::after(0, 0), clock)
    }

    pub fn with_config(config: MechanismConfig, clock: Clock) -> Result<Self, MechanismError> {
        Ok(Self {
            contract: SmartContract::new("Free"),
            ledger: DepositLedger::new(config, clock)?,
        })
    }
}

impl IncentiveMechanism for FreeMechanism {
    fn contract(&self) -> &SmartContract {
        &self.contract
    }

    fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    #[instrument(skip(self, data), fields(mechanism = "free"))]
    fn handle_add_data(
        &mut self,
        contributor: &Address,
        msg_value: Decimal,
        data: &Sample,
        classification: Label,
    ) -> Result<AddDataOutcome, MechanismError> {
        DepositLedger::check_submission(msg_value, data)?;
        let key = self
            .ledger
            .accept_deposit(contributor, data, classification, Decimal::ZERO)?;
        Ok(AddDataOutcome {
            key,
            cost: Decimal::ZERO,
            update_model: true,
        })
    }

    #[instrument(skip(self, _prediction), fields(mechanism = "free"))]
    fn handle_refund(
        &mut self,
        submitter: &Address,
        key: &DataKey,
        claimable_amount: Decimal,
        claimed_by_submitter: bool,
        _prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        self.ledger
            .settle_refund(submitter, key, claimable_amount, claimed_by_submitter, |_| Decimal::ZERO)
    }

    #[instrument(skip(self, _prediction), fields(mechanism = "free"))]
    fn handle_report(
        &mut self,
        reporter: &Address,
        key: &DataKey,
        claimed_by_reporter: bool,
        _prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        self.ledger
            .settle_report(reporter, key, claimed_by_reporter, |_| Decimal::ZERO)
    }

    #[instrument(skip(self), fields(mechanism = "free"))]
    fn distribute_payment_for_prediction(
        &mut self,
        sender: &Address,
        value: Decimal,
    ) -> Result<Vec<Payout>, MechanismError> {
        self.ledger.receive_payment(sender, value, PaymentDistribution::Retain)
    }

    #[instrument(skip(self), fields(mechanism = "free"))]
    fn claim_prediction_fees(&mut self, address: &Address) -> Decimal {
        self.ledger.withdraw_credit(address)
    }
}
