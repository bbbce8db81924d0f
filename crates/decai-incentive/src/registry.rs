//! Registry of stored data, keyed by fingerprint
//!
//! Append-only for keys. Keeps a per-contributor index in submission order
//! for pro-rata fee distribution.

use std::collections::HashMap;

use decai_common::{Address, MechanismError};
use rust_decimal::Decimal;

use crate::stored_data::{DataKey, StoredData};

/// Fingerprint → record map owned by one mechanism
#[derive(Debug, Default)]
pub struct DataRegistry {
    records: HashMap<DataKey, StoredData>,
    by_contributor: HashMap<Address, Vec<DataKey>>,
    sequence: u64,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new record and return its key
    pub(crate) fn insert(&mut self, record: StoredData) -> Result<DataKey, MechanismError> {
        let key = DataKey::fingerprint(
            record.contributor(),
            record.data(),
            record.classification(),
            record.submitted_at(),
            self.sequence,
        )
        .map_err(|e| MechanismError::rejected(format!("cannot fingerprint sample: {}", e)))?;

        self.sequence += 1;
        self.by_contributor
            .entry(record.contributor().clone())
            .or_default()
            .push(key);
        self.records.insert(key, record);
        Ok(key)
    }

    pub fn get(&self, key: &DataKey) -> Option<&StoredData> {
        self.records.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &DataKey) -> Option<&mut StoredData> {
        self.records.get_mut(key)
    }

    pub fn contains(&self, key: &DataKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DataKey, &StoredData)> {
        self.records.iter()
    }

    /// Records submitted by `contributor`, oldest first
    pub fn by_contributor<'a>(
        &'a self,
        contributor: &Address,
    ) -> impl Iterator<Item = (&'a DataKey, &'a StoredData)> + 'a {
        self.by_contributor
            .get(contributor)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.records.get(key).map(|record| (key, record)))
    }

    /// Remaining deposits grouped by contributor, skipping empty stakes
    pub fn stakes(&self) -> Vec<(Address, Decimal)> {
        let mut stakes: Vec<(Address, Decimal)> = self
            .by_contributor
            .keys()
            .map(|contributor| {
                let staked: Decimal = self
                    .by_contributor(contributor)
                    .map(|(_, record)| record.remaining_deposit())
                    .sum();
                (contributor.clone(), staked)
            })
            .filter(|(_, staked)| !staked.is_zero())
            .collect();
        stakes.sort_by(|a, b| a.0.cmp(&b.0));
        stakes
    }

    /// Sum of every remaining deposit
    pub fn total_remaining(&self) -> Decimal {
        self.records.values().map(StoredData::remaining_deposit).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stored_data::Sample;
    use rust_decimal_macros::dec;

    fn record(contributor: &str, deposit: Decimal) -> StoredData {
        StoredData::new(Address::new(contributor), Sample::new(vec![1, 2]), 0, deposit, 0)
    }

    #[test]
    fn test_identical_submissions_get_distinct_keys() {
        let mut registry = DataRegistry::new();
        let a = registry.insert(record("Good", dec!(10))).unwrap();
        let b = registry.insert(record("Good", dec!(10))).unwrap();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_contributor(&Address::new("Good")).count(), 2);
    }

    #[test]
    fn test_by_contributor_order() {
        let mut registry = DataRegistry::new();
        let first = registry.insert(record("Good", dec!(1))).unwrap();
        registry.insert(record("Bad", dec!(2))).unwrap();
        let third = registry.insert(record("Good", dec!(3))).unwrap();

        let keys: Vec<DataKey> = registry
            .by_contributor(&Address::new("Good"))
            .map(|(key, _)| *key)
            .collect();
        assert_eq!(keys, vec![first, third]);
        assert_eq!(registry.by_contributor(&Address::new("Nobody")).count(), 0);
    }

    #[test]
    fn test_stakes_and_total() {
        let mut registry = DataRegistry::new();
        registry.insert(record("Good", dec!(10))).unwrap();
        registry.insert(record("Good", dec!(5))).unwrap();
        registry.insert(record("Bad", dec!(20))).unwrap();
        registry.insert(record("Free", Decimal::ZERO)).unwrap();

        assert_eq!(registry.total_remaining(), dec!(35));
        assert_eq!(
            registry.stakes(),
            vec![(Address::new("Bad"), dec!(20)), (Address::new("Good"), dec!(15))]
        );
    }
}
