//! End-to-end deposit scenarios through the collaborative trainer
//!
//! - Refund window and idempotent full refund
//! - Report before refund and what is left for the contributor
//! - Lazy predictions under the deposit-free mechanism
//! - Stakeable good-data tallies feeding report rewards

use std::cell::Cell;
use std::rc::Rc;

use decai_common::{Address, Balances, Clock, DecaiError, MechanismError, Msg};
use decai_incentive::{
    FreeMechanism, IncentiveMechanism, Label, MechanismConfig, PooledFee, PooledFeeConfig, Sample,
    Stakeable, StakeableConfig,
};
use decai_simulation::{Classifier, CollaborativeTrainer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Predicts a settable class and counts how often it was asked
struct Scripted {
    label: Rc<Cell<Label>>,
    calls: Rc<Cell<u32>>,
}

impl Classifier for Scripted {
    fn predict(&self, _data: &Sample) -> Label {
        self.calls.set(self.calls.get() + 1);
        self.label.get()
    }

    fn update(&mut self, _data: &Sample, _classification: Label) {}
}

struct Harness {
    clock: Clock,
    trainer: CollaborativeTrainer,
    label: Rc<Cell<Label>>,
    calls: Rc<Cell<u32>>,
}

impl Harness {
    fn new(build: impl FnOnce(Clock) -> Box<dyn IncentiveMechanism>) -> Self {
        let clock = Clock::new();
        let mut balances = Balances::new();
        for name in ["Good", "Bad", "Reporter"] {
            balances.initialize(Address::new(name), dec!(1000)).unwrap();
        }
        let label = Rc::new(Cell::new(1));
        let calls = Rc::new(Cell::new(0));
        let model = Scripted {
            label: label.clone(),
            calls: calls.clone(),
        };
        let trainer = CollaborativeTrainer::new(balances, build(clock.clone()), Box::new(model));
        Self {
            clock,
            trainer,
            label,
            calls,
        }
    }

    fn pooled() -> Self {
        Self::new(|clock| {
            let config = PooledFeeConfig {
                mechanism: MechanismConfig::after(3600, 7200),
                ..PooledFeeConfig::default()
            };
            Box::new(PooledFee::new(config, clock).unwrap())
        })
    }

    fn balance(&self, name: &str) -> Decimal {
        self.trainer.balances().get(&Address::new(name))
    }
}

fn sample() -> Sample {
    Sample::new(vec![4, 8, 15, 16, 23, 42])
}

#[test]
fn test_refund_window_and_idempotent_refund() {
    let mut h = Harness::pooled();
    let good = Address::new("Good");
    let key = h
        .trainer
        .add_data(&Msg::new(good.clone(), dec!(100)).unwrap(), &sample(), 1)
        .unwrap()
        .key;

    h.clock.set(1800);
    let err = h.trainer.refund(&good, &key).unwrap_err();
    assert!(matches!(
        err,
        DecaiError::Mechanism(MechanismError::TooEarly {
            now: 1800,
            eligible_at: Some(3600)
        })
    ));

    h.clock.set(3600);
    assert_eq!(h.trainer.refund(&good, &key).unwrap(), dec!(100));
    assert_eq!(h.balance("Good"), dec!(1000));

    assert_eq!(h.trainer.refund(&good, &key).unwrap(), Decimal::ZERO);
    assert_eq!(h.balance("Good"), dec!(1000));

    h.clock.set(7200);
    h.label.set(0);
    assert_eq!(h.trainer.report(&Address::new("Reporter"), &key).unwrap(), Decimal::ZERO);
    assert_eq!(h.balance("Reporter"), dec!(1000));
    assert!(h.trainer.is_conserved());
}

#[test]
fn test_report_then_refund_of_remainder() {
    let mut h = Harness::pooled();
    let bad = Address::new("Bad");
    let key = h
        .trainer
        .add_data(&Msg::new(bad.clone(), dec!(100)).unwrap(), &sample(), 0)
        .unwrap()
        .key;

    h.clock.set(7200);
    let reward = h.trainer.report(&Address::new("Reporter"), &key).unwrap();
    assert!(reward > Decimal::ZERO);
    assert_eq!(h.balance("Reporter"), dec!(1000) + reward);

    h.label.set(0);
    let refund = h.trainer.refund(&bad, &key).unwrap();
    assert!(refund <= dec!(100) - reward);
    assert_eq!(h.balance("Bad"), dec!(900) + refund);
    assert!(h.trainer.is_conserved());
}

#[test]
fn test_contributor_cannot_report_itself() {
    let mut h = Harness::pooled();
    let bad = Address::new("Bad");
    let key = h
        .trainer
        .add_data(&Msg::new(bad.clone(), dec!(10)).unwrap(), &sample(), 0)
        .unwrap()
        .key;
    h.clock.set(7200);

    assert!(matches!(
        h.trainer.report(&bad, &key),
        Err(DecaiError::Mechanism(MechanismError::Unauthorized { .. }))
    ));
    assert!(matches!(
        h.trainer.refund(&Address::new("Reporter"), &key),
        Err(DecaiError::Mechanism(MechanismError::Unauthorized { .. }))
    ));
}

#[test]
fn test_free_mechanism_never_queries_model() {
    let mut h = Harness::new(|clock| Box::new(FreeMechanism::new(clock).unwrap()));
    let good = Address::new("Good");
    let key = h
        .trainer
        .add_data(&Msg::new(good.clone(), dec!(100)).unwrap(), &sample(), 1)
        .unwrap()
        .key;
    assert_eq!(h.balance("Good"), dec!(1000));

    assert_eq!(h.trainer.refund(&good, &key).unwrap(), Decimal::ZERO);
    assert_eq!(h.trainer.report(&Address::new("Reporter"), &key).unwrap(), Decimal::ZERO);
    assert_eq!(h.calls.get(), 0);
    assert!(h.trainer.is_conserved());
}

#[test]
fn test_stakeable_good_data_funds_reports() {
    let mut h = Harness::new(|clock| {
        let config = StakeableConfig {
            mechanism: MechanismConfig::after(3600, 7200),
            ..StakeableConfig::default()
        };
        Box::new(Stakeable::new(config, clock).unwrap())
    });
    let good = Address::new("Good");
    let bad = Address::new("Bad");

    // One minute after start: cost is 60 / √60 → 60 / 7 → 8
    h.clock.set(60);
    let good_key = h
        .trainer
        .add_data(&Msg::new(good.clone(), dec!(50)).unwrap(), &sample(), 1)
        .unwrap();
    assert_eq!(good_key.cost, dec!(8));
    assert_eq!(h.balance("Good"), dec!(992));

    h.clock.set(60 + 3600);
    let bad_key = h
        .trainer
        .add_data(&Msg::new(bad.clone(), dec!(50)).unwrap(), &sample(), 0)
        .unwrap();
    assert_eq!(bad_key.cost, Decimal::ONE);

    // Model agrees with Good: full refund, one unit of good data
    assert_eq!(h.trainer.refund(&good, &good_key.key).unwrap(), dec!(8));

    // Model disagrees with Bad: no refund, Good takes the whole deposit
    h.clock.set(60 + 3600 + 3600);
    assert_eq!(h.trainer.refund(&bad, &bad_key.key).unwrap(), Decimal::ZERO);
    h.clock.set(60 + 3600 + 7200);
    assert_eq!(h.trainer.report(&good, &bad_key.key).unwrap(), Decimal::ONE);

    assert_eq!(h.balance("Good"), dec!(1001));
    assert_eq!(h.balance("Bad"), dec!(999));
    assert!(h.trainer.is_conserved());
}

#[test]
fn test_insufficient_balance_leaves_no_record() {
    let mut h = Harness::pooled();
    let err = h
        .trainer
        .add_data(&Msg::new(Address::new("Good"), dec!(5000)).unwrap(), &sample(), 1)
        .unwrap_err();
    assert!(matches!(err, DecaiError::Ledger(_)));
    assert!(h.trainer.mechanism().ledger().registry().is_empty());
    assert_eq!(h.balance("Good"), dec!(1000));
}
