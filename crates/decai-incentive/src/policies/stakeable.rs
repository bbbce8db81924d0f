//! Stakeable - deposits priced by how recently the model was updated
//!
//! ## Cost Formula
//!
//! ```text
//! cost = max(1, ⌊cost_weight × 60 / ⌊√(now − last_update)⌋⌋)
//! ```
//!
//! Rapid-fire updates are expensive; after an hour of quiet the cost is
//! back to the minimum. Only the cost is taken from the message value.
//!
//! A refund that pays anything marks the record as good data for its
//! contributor. Good-data counts weight what a reporter may claim under
//! [`ReportRule::GoodDataShare`](crate::payout::ReportRule).

use decai_common::{
    Address, ClaimWindow, Clock, MechanismError, SmartContract, Timestamp,
    DEFAULT_ANY_ADDRESS_CLAIM_WAIT_TIME_S, DEFAULT_REFUND_TIME_S,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ledger::DepositLedger;
use crate::mechanism::{AddDataOutcome, IncentiveMechanism, MechanismConfig, PaymentDistribution, Payout};
use crate::payout::{GoodDataTally, PayoutPolicy, PayoutStrategy};
use crate::policies::Settlement;
use crate::prediction::Prediction;
use crate::stored_data::{DataKey, Label, Sample};

/// Seconds-based numerator of the cost curve
const COST_NUMERATOR: u64 = 60;

/// Stakeable configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeableConfig {
    pub mechanism: MechanismConfig,
    /// Multiplier on the cost curve
    pub cost_weight: Decimal,
    pub payouts: PayoutPolicy,
    pub payments: PaymentDistribution,
}

impl Default for StakeableConfig {
    fn default() -> Self {
        Self {
            mechanism: MechanismConfig::new(
                ClaimWindow::After(DEFAULT_REFUND_TIME_S),
                ClaimWindow::After(DEFAULT_ANY_ADDRESS_CLAIM_WAIT_TIME_S),
            ),
            cost_weight: Decimal::ONE,
            payouts: PayoutPolicy::default(),
            payments: PaymentDistribution::Retain,
        }
    }
}

/// Stake-based incentive mechanism
#[derive(Debug)]
pub struct Stakeable {
    contract: SmartContract,
    ledger: DepositLedger,
    cost_weight: Decimal,
    payouts: Box<dyn PayoutStrategy + Send + Sync>,
    payments: PaymentDistribution,
    last_update_time_s: Timestamp,
    good_data: GoodDataTally,
}

impl Stakeable {
    pub fn new(config: StakeableConfig, clock: Clock) -> Result<Self, MechanismError> {
        if config.cost_weight < Decimal::ZERO {
            return Err(MechanismError::InvalidConfiguration(format!(
                "cost_weight must not be negative, got {}",
                config.cost_weight
            )));
        }
        let last_update_time_s = clock.now();
        Ok(Self {
            contract: SmartContract::new("Stakeable"),
            ledger: DepositLedger::new(config.mechanism, clock)?,
            cost_weight: config.cost_weight,
            payouts: Box::new(config.payouts),
            payments: config.payments,
            last_update_time_s,
            good_data: GoodDataTally::new(),
        })
    }

    /// Replace the configured payout policy with a custom strategy
    pub fn with_strategy(mut self, strategy: impl PayoutStrategy + Send + Sync + 'static) -> Self {
        self.payouts = Box::new(strategy);
        self
    }

    /// Cost to add one sample right now
    pub fn next_add_data_cost(&self) -> Result<Decimal, MechanismError> {
        let elapsed = self.ledger.now().saturating_sub(self.last_update_time_s);
        if elapsed == 0 {
            return Err(MechanismError::rejected(
                "not enough time has passed since the last update",
            ));
        }
        let cost = (self.cost_weight * Decimal::from(COST_NUMERATOR) / Decimal::from(isqrt(elapsed))).floor();
        Ok(cost.max(Decimal::ONE))
    }

    /// Records of `contributor` that earned a refund
    pub fn good_data_count(&self, contributor: &Address) -> u64 {
        self.good_data.count(contributor)
    }

    pub fn total_good_data(&self) -> u64 {
        self.good_data.total()
    }

    fn settlement(&mut self) -> Settlement<'_> {
        Settlement {
            ledger: &mut self.ledger,
            strategy: &*self.payouts,
            good_data: &mut self.good_data,
        }
    }
}

fn isqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}

impl IncentiveMechanism for Stakeable {
    fn contract(&self) -> &SmartContract {
        &self.contract
    }

    fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    #[instrument(skip(self, data), fields(mechanism = "stakeable"))]
    fn handle_add_data(
        &mut self,
        contributor: &Address,
        msg_value: Decimal,
        data: &Sample,
        classification: Label,
    ) -> Result<AddDataOutcome, MechanismError> {
        DepositLedger::check_submission(msg_value, data)?;
        let cost = self.next_add_data_cost()?;
        if cost > msg_value {
            return Err(MechanismError::rejected(format!(
                "did not pay enough: sent {} < {}",
                msg_value, cost
            )));
        }

        let key = self.ledger.accept_deposit(contributor, data, classification, cost)?;
        self.last_update_time_s = self.ledger.now();
        Ok(AddDataOutcome {
            key,
            cost,
            update_model: true,
        })
    }

    #[instrument(skip(self, prediction), fields(mechanism = "stakeable"))]
    fn handle_refund(
        &mut self,
        submitter: &Address,
        key: &DataKey,
        claimable_amount: Decimal,
        claimed_by_submitter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        self.settlement()
            .refund(submitter, key, claimable_amount, claimed_by_submitter, prediction)
    }

    #[instrument(skip(self, prediction), fields(mechanism = "stakeable"))]
    fn handle_report(
        &mut self,
        reporter: &Address,
        key: &DataKey,
        claimed_by_reporter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        self.settlement()
            .report(reporter, key, claimed_by_reporter, prediction)
    }

    #[instrument(skip(self), fields(mechanism = "stakeable"))]
    fn distribute_payment_for_prediction(
        &mut self,
        sender: &Address,
        value: Decimal,
    ) -> Result<Vec<Payout>, MechanismError> {
        self.ledger.receive_payment(sender, value, self.payments)
    }

    #[instrument(skip(self), fields(mechanism = "stakeable"))]
    fn claim_prediction_fees(&mut self, address: &Address) -> Decimal {
        let amount = self.ledger.withdraw_credit(address);
        debug!(%address, %amount, "Withdrew prediction fees");
        amount
    }
}
