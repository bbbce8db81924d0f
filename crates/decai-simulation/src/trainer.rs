//! Collaborative trainer - glues balances, a mechanism and a model
//!
//! The trainer plays the role of the contract entry points. It moves value
//! between parties according to what the mechanism decides:
//! - submission costs go from the contributor to the mechanism address
//! - prediction fees go from the caller to the mechanism address, and any
//!   immediate payouts come back out of it
//! - refunds, rewards and fee withdrawals come out of the mechanism address
//!
//! The mechanism address balance therefore always equals the ledger's
//! custody. Every error is returned to the caller as is.

use decai_common::{Address, Balances, DecaiError, MechanismError, Msg, Result};
use decai_incentive::{AddDataOutcome, DataKey, IncentiveMechanism, Label, Prediction, Sample};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::model::Classifier;

pub struct CollaborativeTrainer {
    balances: Balances,
    mechanism: Box<dyn IncentiveMechanism>,
    model: Box<dyn Classifier>,
}

impl CollaborativeTrainer {
    pub fn new(balances: Balances, mechanism: Box<dyn IncentiveMechanism>, model: Box<dyn Classifier>) -> Self {
        Self {
            balances,
            mechanism,
            model,
        }
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn mechanism(&self) -> &dyn IncentiveMechanism {
        self.mechanism.as_ref()
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    /// Where value owed to the mechanism is held
    pub fn mechanism_address(&self) -> &Address {
        &self.mechanism.contract().address
    }

    /// Submit a labeled sample, staking at most `msg.value`
    #[instrument(skip(self, msg, data), fields(sender = %msg.sender, value = %msg.value))]
    pub fn add_data(&mut self, msg: &Msg, data: &Sample, classification: Label) -> Result<AddDataOutcome> {
        self.balances.ensure_available(&msg.sender, msg.value)?;

        let outcome = self
            .mechanism
            .handle_add_data(&msg.sender, msg.value, data, classification)?;
        let im = self.mechanism.contract().address.clone();
        self.balances.send(&msg.sender, &im, outcome.cost)?;

        if outcome.update_model {
            self.model.update(data, classification);
        }
        debug!(key = %outcome.key, cost = %outcome.cost, "Added data");
        Ok(outcome)
    }

    /// Pay `msg.value` to query the model
    #[instrument(skip(self, msg, data), fields(sender = %msg.sender, value = %msg.value))]
    pub fn predict(&mut self, msg: &Msg, data: &Sample) -> Result<Label> {
        self.balances.ensure_available(&msg.sender, msg.value)?;

        let payouts = self
            .mechanism
            .distribute_payment_for_prediction(&msg.sender, msg.value)?;
        let im = self.mechanism.contract().address.clone();
        self.balances.send(&msg.sender, &im, msg.value)?;
        for payout in &payouts {
            self.balances.send(&im, &payout.recipient, payout.amount)?;
        }

        Ok(self.model.predict(data))
    }

    /// Ask for the remaining deposit on `key` back
    #[instrument(skip(self))]
    pub fn refund(&mut self, submitter: &Address, key: &DataKey) -> Result<Decimal> {
        let record = self
            .mechanism
            .stored_data(key)
            .ok_or_else(|| MechanismError::UnknownData(key.to_string()))?;
        let claimable = record.remaining_deposit();
        let claimed = record.is_claimed_by(submitter);
        let data = record.data().clone();

        let model = &self.model;
        let amount = self.mechanism.handle_refund(
            submitter,
            key,
            claimable,
            claimed,
            Prediction::deferred(move || model.predict(&data)),
        )?;
        self.pay_out(submitter, amount)?;
        if !amount.is_zero() {
            info!(%amount, "Refunded deposit");
        }
        Ok(amount)
    }

    /// Report the data under `key` as bad or stale
    #[instrument(skip(self))]
    pub fn report(&mut self, reporter: &Address, key: &DataKey) -> Result<Decimal> {
        let record = self
            .mechanism
            .stored_data(key)
            .ok_or_else(|| MechanismError::UnknownData(key.to_string()))?;
        let claimed = record.is_claimed_by(reporter);
        let data = record.data().clone();

        let model = &self.model;
        let amount = self.mechanism.handle_report(
            reporter,
            key,
            claimed,
            Prediction::deferred(move || model.predict(&data)),
        )?;
        self.pay_out(reporter, amount)?;
        if !amount.is_zero() {
            info!(%amount, "Rewarded report");
        }
        Ok(amount)
    }

    /// Withdraw prediction fees credited to `address`
    pub fn claim_prediction_fees(&mut self, address: &Address) -> Result<Decimal> {
        let amount = self.mechanism.claim_prediction_fees(address);
        self.pay_out(address, amount)?;
        Ok(amount)
    }

    /// Train the model directly, bypassing the mechanism
    pub fn train_unstaked(&mut self, data: &Sample, classification: Label) {
        self.model.update(data, classification);
    }

    fn pay_out(&mut self, recipient: &Address, amount: Decimal) -> Result<()> {
        // The mechanism address has no entry until it first receives value
        if amount.is_zero() {
            return Ok(());
        }
        let im = self.mechanism.contract().address.clone();
        self.balances
            .send(&im, recipient, amount)
            .map_err(DecaiError::from)
    }

    /// Mechanism address balance matches custody and the ledger balances
    pub fn is_conserved(&self) -> bool {
        let ledger = self.mechanism.ledger();
        ledger.is_conserved() && self.balances.get(self.mechanism_address()) == ledger.custody()
    }
}
