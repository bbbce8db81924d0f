//! StoredData - one contributed training sample and its deposit
//!
//! A record is created when a mechanism accepts a submission and is never
//! deleted. After creation only two fields move:
//! - `remaining_deposit` decreases as value is refunded or claimed
//! - `claimed_by` grows as parties extract value
//!
//! Once `remaining_deposit` reaches zero the record is a dormant historical
//! entry.

use std::collections::BTreeSet;

use decai_common::{Address, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Class id assigned to a sample
pub type Label = u8;

/// Sparse bag of feature indices (e.g. word ids of a review)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(Vec<u32>);

impl Sample {
    pub fn new(features: Vec<u32>) -> Self {
        Self(features)
    }

    pub fn features(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u32>> for Sample {
    fn from(features: Vec<u32>) -> Self {
        Self(features)
    }
}

/// BLAKE3 fingerprint identifying a stored record
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataKey([u8; 32]);

impl DataKey {
    /// Fingerprint `(contributor, data, classification, submitted_at)`.
    ///
    /// `sequence` is the mechanism's submission counter; it keeps identical
    /// submissions made in the same second apart.
    pub fn fingerprint(
        contributor: &Address,
        data: &Sample,
        classification: Label,
        submitted_at: Timestamp,
        sequence: u64,
    ) -> Result<Self, bincode::Error> {
        let mut hasher = blake3::Hasher::new();
        bincode::serialize_into(
            &mut hasher,
            &(contributor, data, classification, submitted_at, sequence),
        )?;
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataKey({}..)", hex::encode(&self.0[..6]))
    }
}

/// A persisted training sample with its deposit bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredData {
    contributor: Address,
    data: Sample,
    classification: Label,
    deposit: Decimal,
    submitted_at: Timestamp,
    claimed_by: BTreeSet<Address>,
    remaining_deposit: Decimal,
}

impl StoredData {
    pub(crate) fn new(
        contributor: Address,
        data: Sample,
        classification: Label,
        deposit: Decimal,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            contributor,
            data,
            classification,
            deposit,
            submitted_at,
            claimed_by: BTreeSet::new(),
            remaining_deposit: deposit,
        }
    }

    pub fn contributor(&self) -> &Address {
        &self.contributor
    }

    pub fn data(&self) -> &Sample {
        &self.data
    }

    pub fn classification(&self) -> Label {
        self.classification
    }

    /// Amount staked at submission
    pub fn deposit(&self) -> Decimal {
        self.deposit
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn remaining_deposit(&self) -> Decimal {
        self.remaining_deposit
    }

    pub fn claimed_by(&self) -> &BTreeSet<Address> {
        &self.claimed_by
    }

    pub fn is_claimed_by(&self, address: &Address) -> bool {
        self.claimed_by.contains(address)
    }

    /// Nothing left to refund or claim
    pub fn is_exhausted(&self) -> bool {
        self.remaining_deposit.is_zero()
    }

    /// Take up to `amount` out of the remaining deposit for `claimant`.
    ///
    /// Returns what was actually taken. The claimant is only recorded when
    /// something was taken.
    pub(crate) fn settle(&mut self, claimant: &Address, amount: Decimal) -> Decimal {
        let taken = amount.max(Decimal::ZERO).min(self.remaining_deposit);
        if taken.is_zero() {
            return Decimal::ZERO;
        }
        self.remaining_deposit -= taken;
        self.claimed_by.insert(claimant.clone());
        taken
    }
}
