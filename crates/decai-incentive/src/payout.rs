//! Payout strategies - how much of a deposit a refund or report releases
//!
//! The ledger has already checked windows, authorization and re-claims by
//! the time a strategy runs; it also clamps whatever the strategy returns.
//! Strategies only answer "how much", given the record and the model's
//! prediction. Rules that do not look at the prediction never resolve it.

use std::collections::HashMap;

use decai_common::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::prediction::Prediction;
use crate::stored_data::StoredData;

/// Inputs for a refund decision
#[derive(Debug)]
pub struct RefundContext<'a> {
    pub record: &'a StoredData,
    pub prediction: Prediction<'a>,
}

/// Inputs for a report decision
#[derive(Debug)]
pub struct ReportContext<'a> {
    pub record: &'a StoredData,
    pub reporter: &'a Address,
    pub prediction: Prediction<'a>,
    /// Records of the reporter's that earned a refund
    pub reporter_good_data: u64,
    /// Records that earned a refund, across all contributors
    pub total_good_data: u64,
}

/// Pluggable refund/report formula
pub trait PayoutStrategy: std::fmt::Debug {
    fn refund_amount(&self, ctx: RefundContext<'_>) -> Decimal;

    fn report_amount(&self, ctx: ReportContext<'_>) -> Decimal;
}

/// Refund formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundRule {
    /// Everything left, regardless of the model
    Unconditional,
    /// Everything left if the model agrees with the label, nothing otherwise
    RequireAgreement,
    /// Everything left on agreement, a fraction of it on disagreement
    Partial { on_disagreement: Decimal },
}

/// Report formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRule {
    /// Everything left, regardless of the model
    ClaimRemaining,
    /// On disagreement: `deposit × good(reporter) / total_good`
    GoodDataShare,
    /// On disagreement: `fraction × deposit`
    FixedFraction { fraction: Decimal },
}

/// Serde-configurable strategy built from one refund and one report rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    pub refund: RefundRule,
    pub report: ReportRule,
}

impl PayoutPolicy {
    pub fn new(refund: RefundRule, report: ReportRule) -> Self {
        Self { refund, report }
    }
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self::new(RefundRule::RequireAgreement, ReportRule::GoodDataShare)
    }
}

fn clamp_fraction(fraction: Decimal) -> Decimal {
    fraction.max(Decimal::ZERO).min(Decimal::ONE)
}

impl PayoutStrategy for PayoutPolicy {
    fn refund_amount(&self, ctx: RefundContext<'_>) -> Decimal {
        let remaining = ctx.record.remaining_deposit();
        match self.refund {
            RefundRule::Unconditional => remaining,
            RefundRule::RequireAgreement => {
                if ctx.prediction.agrees_with(ctx.record.classification()) {
                    remaining
                } else {
                    Decimal::ZERO
                }
            }
            RefundRule::Partial { on_disagreement } => {
                if ctx.prediction.agrees_with(ctx.record.classification()) {
                    remaining
                } else {
                    remaining * clamp_fraction(on_disagreement)
                }
            }
        }
    }

    fn report_amount(&self, ctx: ReportContext<'_>) -> Decimal {
        let record = ctx.record;
        match self.report {
            ReportRule::ClaimRemaining => record.remaining_deposit(),
            ReportRule::GoodDataShare => {
                if ctx.reporter_good_data == 0 || ctx.total_good_data == 0 {
                    return Decimal::ZERO;
                }
                if ctx.prediction.agrees_with(record.classification()) {
                    return Decimal::ZERO;
                }
                let ratio = Decimal::from(ctx.reporter_good_data) / Decimal::from(ctx.total_good_data);
                let share = record.deposit().checked_mul(ratio).unwrap_or_else(|| record.deposit());
                // Rounding can leave a share of nothing; hand over the rest
                if share <= Decimal::ZERO {
                    record.remaining_deposit()
                } else {
                    share
                }
            }
            ReportRule::FixedFraction { fraction } => {
                if ctx.prediction.agrees_with(record.classification()) {
                    Decimal::ZERO
                } else {
                    record.deposit() * clamp_fraction(fraction)
                }
            }
        }
    }
}

/// Count of records per contributor that earned a refund
#[derive(Debug, Clone, Default)]
pub struct GoodDataTally {
    per_contributor: HashMap<Address, u64>,
    total: u64,
}

impl GoodDataTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, contributor: &Address) {
        *self.per_contributor.entry(contributor.clone()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, contributor: &Address) -> u64 {
        self.per_contributor.get(contributor).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
