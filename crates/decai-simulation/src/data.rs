//! Synthetic bag-of-words data
//!
//! Stands in for a tokenized review corpus: each sample is a sorted set of
//! word indices and a binary sentiment label. Class 0 draws its indicative
//! words from the lower half of the vocabulary and class 1 from the upper
//! half; `signal` is the probability that any one word is indicative
//! rather than uniform noise.

use decai_common::DecaiError;
use decai_incentive::{Label, Sample};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A sample with its true label
pub type LabeledSample = (Sample, Label);

/// Dataset shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Vocabulary size
    pub num_features: u32,
    /// Words drawn per sample, before deduplication
    pub words_per_sample: usize,
    /// Probability a word is indicative of the label
    pub signal: f64,
    pub train_size: usize,
    pub test_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            num_features: 1000,
            words_per_sample: 20,
            signal: 0.6,
            train_size: 4000,
            test_size: 1000,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<(), DecaiError> {
        if self.num_features < 2 {
            return Err(DecaiError::Config("data.num_features must be at least 2".into()));
        }
        if self.words_per_sample == 0 {
            return Err(DecaiError::Config("data.words_per_sample must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.signal) {
            return Err(DecaiError::Config(format!(
                "data.signal must be within [0, 1], got {}",
                self.signal
            )));
        }
        if self.train_size == 0 || self.test_size == 0 {
            return Err(DecaiError::Config("data.train_size and data.test_size must be positive".into()));
        }
        Ok(())
    }
}

/// Train/test split
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Vec<LabeledSample>,
    pub test: Vec<LabeledSample>,
}

impl Dataset {
    /// Draw a dataset from `rng`
    pub fn generate<R: Rng + ?Sized>(config: &DataConfig, rng: &mut R) -> Self {
        let train = (0..config.train_size).map(|_| sample(config, rng)).collect();
        let test = (0..config.test_size).map(|_| sample(config, rng)).collect();
        Self { train, test }
    }
}

fn sample<R: Rng + ?Sized>(config: &DataConfig, rng: &mut R) -> LabeledSample {
    let label: Label = u8::from(rng.gen_bool(0.5));
    let half = config.num_features / 2;
    let (lo, hi) = if label == 0 {
        (0, half)
    } else {
        (half, config.num_features)
    };

    let mut words: Vec<u32> = (0..config.words_per_sample)
        .map(|_| {
            if rng.gen_bool(config.signal) {
                rng.gen_range(lo..hi)
            } else {
                rng.gen_range(0..config.num_features)
            }
        })
        .collect();
    words.sort_unstable();
    words.dedup();
    (Sample::new(words), label)
}

/// The other class of a binary label
pub fn flip(label: Label) -> Label {
    u8::from(label == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_shape() {
        let config = DataConfig {
            train_size: 50,
            test_size: 10,
            ..DataConfig::default()
        };
        let dataset = Dataset::generate(&config, &mut StdRng::seed_from_u64(7));
        assert_eq!(dataset.train.len(), 50);
        assert_eq!(dataset.test.len(), 10);
        for (sample, label) in dataset.train.iter().chain(&dataset.test) {
            assert!(*label <= 1);
            assert!(!sample.is_empty());
            assert!(sample.features().windows(2).all(|w| w[0] < w[1]));
            assert!(sample.features().iter().all(|&f| f < config.num_features));
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let config = DataConfig::default();
        let a = Dataset::generate(&config, &mut StdRng::seed_from_u64(1));
        let b = Dataset::generate(&config, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_full_signal_is_separable() {
        let config = DataConfig {
            signal: 1.0,
            train_size: 100,
            test_size: 1,
            ..DataConfig::default()
        };
        let dataset = Dataset::generate(&config, &mut StdRng::seed_from_u64(3));
        for (sample, label) in &dataset.train {
            let upper = sample.features().iter().all(|&f| f >= config.num_features / 2);
            assert_eq!(upper, *label == 1);
        }
    }

    #[test]
    fn test_validate() {
        assert!(DataConfig::default().validate().is_ok());
        let bad = DataConfig {
            signal: 1.5,
            ..DataConfig::default()
        };
        assert!(matches!(bad.validate(), Err(DecaiError::Config(_))));
    }

    #[test]
    fn test_flip() {
        assert_eq!(flip(0), 1);
        assert_eq!(flip(1), 0);
    }
}
