//! PooledFee - whole-value stakes that earn a share of prediction fees
//!
//! The entire message value is staked, subject to a minimum. Fees paid to
//! query the model are split pro-rata to currently staked deposits, so data
//! that stays in the pool longer earns more. Reports take a fixed fraction
//! of the original deposit by default.

use decai_common::{
    Address, ClaimWindow, Clock, MechanismError, SmartContract, DEFAULT_ANY_ADDRESS_CLAIM_WAIT_TIME_S,
    DEFAULT_REFUND_TIME_S,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ledger::DepositLedger;
use crate::mechanism::{AddDataOutcome, IncentiveMechanism, MechanismConfig, PaymentDistribution, Payout};
use crate::payout::{GoodDataTally, PayoutPolicy, PayoutStrategy, RefundRule, ReportRule};
use crate::policies::Settlement;
use crate::prediction::Prediction;
use crate::stored_data::{DataKey, Label, Sample};

/// PooledFee configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PooledFeeConfig {
    pub mechanism: MechanismConfig,
    /// Smallest accepted stake
    pub min_deposit: Decimal,
    pub payouts: PayoutPolicy,
    pub payments: PaymentDistribution,
}

impl Default for PooledFeeConfig {
    fn default() -> Self {
        Self {
            mechanism: MechanismConfig::new(
                ClaimWindow::After(DEFAULT_REFUND_TIME_S),
                ClaimWindow::After(DEFAULT_ANY_ADDRESS_CLAIM_WAIT_TIME_S),
            ),
            min_deposit: Decimal::ONE,
            payouts: PayoutPolicy::new(
                RefundRule::RequireAgreement,
                ReportRule::FixedFraction {
                    fraction: Decimal::new(5, 1),
                },
            ),
            payments: PaymentDistribution::ProRataCredit,
        }
    }
}

/// Pooled-fee incentive mechanism
#[derive(Debug)]
pub struct PooledFee {
    contract: SmartContract,
    ledger: DepositLedger,
    min_deposit: Decimal,
    payouts: Box<dyn PayoutStrategy + Send + Sync>,
    payments: PaymentDistribution,
    good_data: GoodDataTally,
}

impl PooledFee {
    pub fn new(config: PooledFeeConfig, clock: Clock) -> Result<Self, MechanismError> {
        if config.min_deposit < Decimal::ZERO {
            return Err(MechanismError::InvalidConfiguration(format!(
                "min_deposit must not be negative, got {}",
                config.min_deposit
            )));
        }
        Ok(Self {
            contract: SmartContract::new("PooledFee"),
            ledger: DepositLedger::new(config.mechanism, clock)?,
            min_deposit: config.min_deposit,
            payouts: Box::new(config.payouts),
            payments: config.payments,
            good_data: GoodDataTally::new(),
        })
    }

    pub fn with_strategy(mut self, strategy: impl PayoutStrategy + Send + Sync + 'static) -> Self {
        self.payouts = Box::new(strategy);
        self
    }

    pub fn min_deposit(&self) -> Decimal {
        self.min_deposit
    }

    fn settlement(&mut self) -> Settlement<'_> {
        Settlement {
            ledger: &mut self.ledger,
            strategy: &*self.payouts,
            good_data: &mut self.good_data,
        }
    }
}

impl IncentiveMechanism for PooledFee {
    fn contract(&self) -> &SmartContract {
        &self.contract
    }

    fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    #[instrument(skip(self, data), fields(mechanism = "pooled_fee"))]
    fn handle_add_data(
        &mut self,
        contributor: &Address,
        msg_value: Decimal,
        data: &Sample,
        classification: Label,
    ) -> Result<AddDataOutcome, MechanismError> {
        DepositLedger::check_submission(msg_value, data)?;
        if msg_value < self.min_deposit {
            return Err(MechanismError::rejected(format!(
                "deposit {} is below the minimum of {}",
                msg_value, self.min_deposit
            )));
        }

        let key = self
            .ledger
            .accept_deposit(contributor, data, classification, msg_value)?;
        Ok(AddDataOutcome {
            key,
            cost: msg_value,
            update_model: true,
        })
    }

    #[instrument(skip(self, prediction), fields(mechanism = "pooled_fee"))]
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

    #[instrument(skip(self, prediction), fields(mechanism = "pooled_fee"))]
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

    #[instrument(skip(self), fields(mechanism = "pooled_fee"))]
    fn distribute_payment_for_prediction(
        &mut self,
        sender: &Address,
        value: Decimal,
    ) -> Result<Vec<Payout>, MechanismError> {
        self.ledger.receive_payment(sender, value, self.payments)
    }

    #[instrument(skip(self), fields(mechanism = "pooled_fee"))]
    fn claim_prediction_fees(&mut self, address: &Address) -> Decimal {
        let amount = self.ledger.withdraw_credit(address);
        debug!(%address, %amount, "Withdrew prediction fees");
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pooled(clock: &Clock) -> PooledFee {
        let config = PooledFeeConfig {
            mechanism: MechanismConfig::after(3600, 7200),
            ..PooledFeeConfig::default()
        };
        PooledFee::new(config, clock.clone()).unwrap()
    }

    fn sample() -> Sample {
        Sample::new(vec![2, 3, 5, 7])
    }

    #[test]
    fn test_min_deposit() {
        let clock = Clock::new();
        let mut im = pooled(&clock);
        let err = im
            .handle_add_data(&Address::new("Good"), dec!(0.5), &sample(), 1)
            .unwrap_err();
        assert!(matches!(err, MechanismError::RejectedSubmission { .. }));

        let outcome = im
            .handle_add_data(&Address::new("Good"), dec!(100), &sample(), 1)
            .unwrap();
        assert_eq!(outcome.cost, dec!(100));
    }

    #[test]
    fn test_refund_then_report_finds_nothing() {
        let clock = Clock::new();
        let mut im = pooled(&clock);
        let good = Address::new("Good");
        let key = im.handle_add_data(&good, dec!(100), &sample(), 1).unwrap().key;

        clock.set(1800);
        let err = im.handle_refund(&good, &key, dec!(100), false, 1.into()).unwrap_err();
        assert_eq!(
            err,
            MechanismError::TooEarly {
                now: 1800,
                eligible_at: Some(3600)
            }
        );

        clock.set(3600);
        assert_eq!(
            im.handle_refund(&good, &key, dec!(100), false, 1.into()).unwrap(),
            dec!(100)
        );
        assert!(im.stored_data(&key).unwrap().is_exhausted());

        // Second refund is a no-op
        assert_eq!(
            im.handle_refund(&good, &key, dec!(100), true, 1.into()).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(im.stored_data(&key).unwrap().claimed_by().len(), 1);

        clock.set(7200);
        let reward = im
            .handle_report(&Address::new("Reporter"), &key, false, 0.into())
            .unwrap();
        assert_eq!(reward, Decimal::ZERO);
        assert!(im.ledger().is_conserved());
    }

    #[test]
    fn test_report_before_refund() {
        let clock = Clock::new();
        let mut im = pooled(&clock);
        let contributor = Address::new("Bad");
        let reporter = Address::new("Reporter");
        let key = im.handle_add_data(&contributor, dec!(100), &sample(), 0).unwrap().key;

        clock.set(7200);
        let reward = im.handle_report(&reporter, &key, false, 1.into()).unwrap();
        assert_eq!(reward, dec!(50));
        assert_eq!(im.stored_data(&key).unwrap().remaining_deposit(), dec!(50));

        // Reporting again pays nothing
        assert_eq!(
            im.handle_report(&reporter, &key, false, 1.into()).unwrap(),
            Decimal::ZERO
        );

        // Model now agrees again; contributor gets what is left
        clock.set(9000);
        let refund = im.handle_refund(&contributor, &key, dec!(100), false, 0.into()).unwrap();
        assert_eq!(refund, dec!(50));
        assert!(im.ledger().is_conserved());
    }

    #[test]
    fn test_contributor_cannot_report_own_data() {
        let clock = Clock::new();
        let mut im = pooled(&clock);
        let good = Address::new("Good");
        let key = im.handle_add_data(&good, dec!(10), &sample(), 1).unwrap().key;
        clock.set(10_000);

        let err = im.handle_report(&good, &key, false, 0.into()).unwrap_err();
        assert!(matches!(err, MechanismError::Unauthorized { .. }));
    }

    #[test]
    fn test_fees_credited_pro_rata() {
        let clock = Clock::new();
        let mut im = pooled(&clock);
        let a = Address::new("A");
        let b = Address::new("B");
        im.handle_add_data(&a, dec!(75), &sample(), 1).unwrap();
        im.handle_add_data(&b, dec!(25), &sample(), 1).unwrap();

        let payouts = im
            .distribute_payment_for_prediction(&Address::new("Caller"), dec!(40))
            .unwrap();
        assert!(payouts.is_empty());
        assert_eq!(im.ledger().credit_of(&a), dec!(30));
        assert_eq!(im.ledger().credit_of(&b), dec!(10));

        assert_eq!(im.claim_prediction_fees(&a), dec!(30));
        assert_eq!(im.ledger().credit_of(&a), Decimal::ZERO);
        assert!(im.ledger().is_conserved());
    }

    #[test]
    fn test_immediate_distribution() {
        let clock = Clock::new();
        let config = PooledFeeConfig {
            mechanism: MechanismConfig::after(3600, 7200),
            payments: PaymentDistribution::ProRataImmediate,
            ..PooledFeeConfig::default()
        };
        let mut im = PooledFee::new(config, clock).unwrap();
        let a = Address::new("A");
        im.handle_add_data(&a, dec!(10), &sample(), 1).unwrap();

        let payouts = im
            .distribute_payment_for_prediction(&Address::new("Caller"), dec!(5))
            .unwrap();
        assert_eq!(
            payouts,
            vec![Payout {
                recipient: a,
                amount: dec!(5)
            }]
        );
        assert_eq!(im.ledger().total_paid_out(), dec!(5));
        assert!(im.ledger().is_conserved());
    }
}
