//! Incentive mechanism variants
pub mod free;
pub mod pooled;
pub mod stakeable;

use decai_common::{Address, MechanismError};
use rust_decimal::Decimal;

use crate::ledger::DepositLedger;
use crate::payout::{GoodDataTally, PayoutStrategy, RefundContext, ReportContext};
use crate::prediction::Prediction;
use crate::stored_data::DataKey;

/// Refunds and reports priced by a payout strategy.
///
/// A refund that pays anything counts as good data for the submitter.
/// Reports only read the tally, and only strategies that weigh reporters by
/// good data look at it.
pub(crate) struct Settlement<'a> {
    pub ledger: &'a mut DepositLedger,
    pub strategy: &'a dyn PayoutStrategy,
    pub good_data: &'a mut GoodDataTally,
}

impl Settlement<'_> {
    pub fn refund(
        self,
        submitter: &Address,
        key: &DataKey,
        claimable_amount: Decimal,
        claimed_by_submitter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        let strategy = self.strategy;
        let refund = self.ledger.settle_refund(
            submitter,
            key,
            claimable_amount,
            claimed_by_submitter,
            |record| strategy.refund_amount(RefundContext { record, prediction }),
        )?;

        if !refund.is_zero() {
            self.good_data.record(submitter);
        }
        Ok(refund)
    }

    pub fn report(
        self,
        reporter: &Address,
        key: &DataKey,
        claimed_by_reporter: bool,
        prediction: Prediction<'_>,
    ) -> Result<Decimal, MechanismError> {
        let strategy = self.strategy;
        let good_data = &*self.good_data;
        self.ledger
            .settle_report(reporter, key, claimed_by_reporter, |record| {
                strategy.report_amount(ReportContext {
                    record,
                    reporter,
                    prediction,
                    reporter_good_data: good_data.count(reporter),
                    total_good_data: good_data.total(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::MechanismConfig;
    use crate::payout::{PayoutPolicy, RefundRule, ReportRule};
    use decai_common::Clock;
    use rust_decimal_macros::dec;

    #[test]
    fn test_good_data_weighs_report() {
        let clock = Clock::new();
        let mut ledger = DepositLedger::new(MechanismConfig::after(10, 20), clock.clone()).unwrap();
        let mut good_data = GoodDataTally::new();
        let policy = PayoutPolicy::new(RefundRule::RequireAgreement, ReportRule::GoodDataShare);
        let sample = crate::stored_data::Sample::new(vec![3]);

        let good = Address::new("Good");
        let bad = Address::new("Bad");
        let good_key = ledger.accept_deposit(&good, &sample, 1, dec!(10)).unwrap();
        let bad_key = ledger.accept_deposit(&bad, &sample, 0, dec!(10)).unwrap();

        clock.set(10);
        let refund = Settlement {
            ledger: &mut ledger,
            strategy: &policy,
            good_data: &mut good_data,
        }
        .refund(&good, &good_key, dec!(10), false, Prediction::from(1))
        .unwrap();
        assert_eq!(refund, dec!(10));
        assert_eq!(good_data.count(&good), 1);

        // Nothing paid, nothing tallied
        let refund = Settlement {
            ledger: &mut ledger,
            strategy: &policy,
            good_data: &mut good_data,
        }
        .refund(&bad, &bad_key, dec!(10), false, Prediction::from(1))
        .unwrap();
        assert_eq!(refund, Decimal::ZERO);
        assert_eq!(good_data.total(), 1);

        clock.set(20);
        let reward = Settlement {
            ledger: &mut ledger,
            strategy: &policy,
            good_data: &mut good_data,
        }
        .report(&good, &bad_key, false, Prediction::from(1))
        .unwrap();
        assert_eq!(reward, dec!(10));
        assert!(ledger.is_conserved());
    }
}
