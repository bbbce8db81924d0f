//! Deposit ledger - custody and claim state machine shared by all mechanisms
//!
//! The ledger owns the registry, the two claim windows and the clock handle.
//! It is the only place value enters or leaves a mechanism's custody:
//! - deposits enter through [`DepositLedger::accept_deposit`]
//! - prediction fees enter through [`DepositLedger::receive_payment`]
//! - value leaves through refunds, reports, immediate fee payouts and
//!   credit withdrawals
//!
//! Conservation: `custody() == total_received() - total_paid_out()` after
//! every operation.

use std::collections::BTreeMap;

use decai_common::{Address, Clock, MechanismError, Timestamp};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::mechanism::{MechanismConfig, PaymentDistribution, Payout};
use crate::registry::DataRegistry;
use crate::stored_data::{DataKey, Label, Sample, StoredData};

/// Decimal places kept on computed payouts; keeps custody sums exact
pub const VALUE_SCALE: u32 = 18;

fn truncate(amount: Decimal) -> Decimal {
    amount
        .max(Decimal::ZERO)
        .round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::ToZero)
}

/// `value * staked / total_stake`, never rounded up.
///
/// The ratio is taken first so the product stays within `value`.
fn pro_rata_share(value: Decimal, staked: Decimal, total_stake: Decimal) -> Decimal {
    staked
        .checked_div(total_stake)
        .map(|ratio| ratio.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::ToZero))
        .and_then(|ratio| value.checked_mul(ratio))
        .map(truncate)
        .unwrap_or(Decimal::ZERO)
}

/// Records and value held by one mechanism
#[derive(Debug)]
pub struct DepositLedger {
    config: MechanismConfig,
    clock: Clock,
    registry: DataRegistry,
    total_received: Decimal,
    total_paid_out: Decimal,
    /// Prediction fees not allocated to anyone
    pooled_fees: Decimal,
    /// Prediction fees allocated but not yet withdrawn
    credits: BTreeMap<Address, Decimal>,
}

impl DepositLedger {
    /// Create an empty ledger, rejecting misordered windows
    pub fn new(config: MechanismConfig, clock: Clock) -> Result<Self, MechanismError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            registry: DataRegistry::new(),
            total_received: Decimal::ZERO,
            total_paid_out: Decimal::ZERO,
            pooled_fees: Decimal::ZERO,
            credits: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &MechanismConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn registry(&self) -> &DataRegistry {
        &self.registry
    }

    /// Reject negative values and empty samples
    pub(crate) fn check_submission(msg_value: Decimal, data: &Sample) -> Result<(), MechanismError> {
        if msg_value < Decimal::ZERO {
            return Err(MechanismError::rejected(format!(
                "message value must not be negative, got {}",
                msg_value
            )));
        }
        if data.is_empty() {
            return Err(MechanismError::rejected("sample has no features"));
        }
        Ok(())
    }

    /// Persist a new record holding `deposit`
    pub(crate) fn accept_deposit(
        &mut self,
        contributor: &Address,
        data: &Sample,
        classification: Label,
        deposit: Decimal,
    ) -> Result<DataKey, MechanismError> {
        let total_received = self
            .total_received
            .checked_add(deposit)
            .ok_or_else(|| MechanismError::rejected(format!("deposit {} exceeds custody capacity", deposit)))?;
        let record = StoredData::new(
            contributor.clone(),
            data.clone(),
            classification,
            deposit,
            self.now(),
        );
        let key = self.registry.insert(record)?;
        self.total_received = total_received;
        debug!(%contributor, %key, %deposit, "Stored data");
        Ok(key)
    }

    fn lookup(&self, key: &DataKey) -> Result<&StoredData, MechanismError> {
        self.registry
            .get(key)
            .ok_or_else(|| MechanismError::UnknownData(key.to_string()))
    }

    /// Run a refund for `submitter` through the state machine.
    ///
    /// `decide` proposes an amount; it is only called when something can
    /// actually be paid, and its result is clamped to
    /// `min(claimable_amount, remaining_deposit)`.
    pub(crate) fn settle_refund<F>(
        &mut self,
        submitter: &Address,
        key: &DataKey,
        claimable_amount: Decimal,
        claimed_by_submitter: bool,
        decide: F,
    ) -> Result<Decimal, MechanismError>
    where
        F: FnOnce(&StoredData) -> Decimal,
    {
        let now = self.now();
        let window = self.config.refund_time_s;
        let record = self.lookup(key)?;

        if record.contributor() != submitter {
            return Err(MechanismError::Unauthorized {
                caller: submitter.to_string(),
                contributor: record.contributor().to_string(),
            });
        }
        if !window.is_open(record.submitted_at(), now) {
            return Err(MechanismError::TooEarly {
                now,
                eligible_at: window.opens_at(record.submitted_at()),
            });
        }
        if claimed_by_submitter || record.is_claimed_by(submitter) {
            debug!(%submitter, %key, "Deposit already refunded");
            return Ok(Decimal::ZERO);
        }

        let limit = claimable_amount.max(Decimal::ZERO).min(record.remaining_deposit());
        if limit.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let amount = truncate(decide(record)).min(limit);
        Ok(self.pay_from_deposit(key, submitter, amount))
    }

    /// Run a report by `reporter` through the state machine.
    ///
    /// Contributors cannot report their own data. `decide` is clamped to the
    /// remaining deposit.
    pub(crate) fn settle_report<F>(
        &mut self,
        reporter: &Address,
        key: &DataKey,
        claimed_by_reporter: bool,
        decide: F,
    ) -> Result<Decimal, MechanismError>
    where
        F: FnOnce(&StoredData) -> Decimal,
    {
        let now = self.now();
        let window = self.config.any_address_claim_wait_time_s;
        let record = self.lookup(key)?;

        if record.contributor() == reporter {
            return Err(MechanismError::Unauthorized {
                caller: reporter.to_string(),
                contributor: record.contributor().to_string(),
            });
        }
        if !window.is_open(record.submitted_at(), now) {
            return Err(MechanismError::TooEarly {
                now,
                eligible_at: window.opens_at(record.submitted_at()),
            });
        }
        if claimed_by_reporter || record.is_claimed_by(reporter) || record.is_exhausted() {
            return Ok(Decimal::ZERO);
        }

        let amount = truncate(decide(record)).min(record.remaining_deposit());
        Ok(self.pay_from_deposit(key, reporter, amount))
    }

    fn pay_from_deposit(&mut self, key: &DataKey, claimant: &Address, amount: Decimal) -> Decimal {
        let paid = self
            .registry
            .get_mut(key)
            .map(|record| record.settle(claimant, amount))
            .unwrap_or(Decimal::ZERO);
        self.total_paid_out += paid;
        if !paid.is_zero() {
            info!(%claimant, %key, %paid, "Released deposit");
        }
        paid
    }

    /// Take a prediction fee into custody and allocate it
    pub(crate) fn receive_payment(
        &mut self,
        sender: &Address,
        value: Decimal,
        distribution: PaymentDistribution,
    ) -> Result<Vec<Payout>, MechanismError> {
        if value < Decimal::ZERO {
            return Err(MechanismError::RejectedPayment {
                reason: format!("payment must not be negative, got {}", value),
            });
        }
        let total_received = self
            .total_received
            .checked_add(value)
            .ok_or_else(|| MechanismError::RejectedPayment {
                reason: format!("payment {} exceeds custody capacity", value),
            })?;
        self.total_received = total_received;
        if value.is_zero() {
            return Ok(Vec::new());
        }

        // Bounded by custody, which already fits
        let stakes = self.registry.stakes();
        let total_stake: Decimal = stakes.iter().map(|(_, staked)| *staked).sum();
        if distribution == PaymentDistribution::Retain || total_stake.is_zero() {
            self.pooled_fees += value;
            debug!(%sender, %value, "Pooled prediction fee");
            return Ok(Vec::new());
        }

        let mut allocated = Decimal::ZERO;
        let mut payouts = Vec::with_capacity(stakes.len());
        for (contributor, staked) in stakes {
            let share = pro_rata_share(value, staked, total_stake).min(value - allocated);
            if share.is_zero() {
                continue;
            }
            allocated += share;
            payouts.push(Payout {
                recipient: contributor,
                amount: share,
            });
        }
        // Division leftovers stay pooled
        self.pooled_fees += value - allocated;

        match distribution {
            PaymentDistribution::ProRataImmediate => {
                self.total_paid_out += allocated;
                debug!(%sender, %value, recipients = payouts.len(), "Paid prediction fee");
                Ok(payouts)
            }
            _ => {
                for payout in payouts {
                    *self.credits.entry(payout.recipient).or_insert(Decimal::ZERO) += payout.amount;
                }
                debug!(%sender, %value, "Credited prediction fee");
                Ok(Vec::new())
            }
        }
    }

    /// Withdraw everything credited to `address`
    pub(crate) fn withdraw_credit(&mut self, address: &Address) -> Decimal {
        let amount = self.credits.remove(address).unwrap_or(Decimal::ZERO);
        self.total_paid_out += amount;
        amount
    }

    /// Fees credited to `address` and not yet withdrawn
    pub fn credit_of(&self, address: &Address) -> Decimal {
        self.credits.get(address).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn pooled_fees(&self) -> Decimal {
        self.pooled_fees
    }

    pub fn total_received(&self) -> Decimal {
        self.total_received
    }

    pub fn total_paid_out(&self) -> Decimal {
        self.total_paid_out
    }

    /// Value currently held
    pub fn custody(&self) -> Decimal {
        self.registry.total_remaining() + self.pooled_fees + self.credits.values().copied().sum::<Decimal>()
    }

    /// Whether no value has been created or destroyed
    pub fn is_conserved(&self) -> bool {
        self.custody() == self.total_received - self.total_paid_out
    }
}
