//! Model adapter
//!
//! The mechanisms only ever see a model through a lazily evaluated
//! [`Prediction`](decai_incentive::Prediction); the trainer builds those
//! from a [`Classifier`].

use decai_incentive::{Label, Sample};

/// A model that can be queried and trained one sample at a time
pub trait Classifier {
    fn predict(&self, data: &Sample) -> Label;

    fn update(&mut self, data: &Sample, classification: Label);

    /// Fraction of `samples` predicted correctly, 0 for an empty set
    fn evaluate(&self, samples: &[(Sample, Label)]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let correct = samples
            .iter()
            .filter(|(data, label)| self.predict(data) == *label)
            .count();
        correct as f64 / samples.len() as f64
    }
}

/// Binary perceptron over sparse bag-of-features samples.
///
/// Any non-zero label is treated as the positive class. Feature indices
/// outside the configured dimension are ignored.
#[derive(Debug, Clone)]
pub struct Perceptron {
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
}

impl Perceptron {
    pub fn new(num_features: u32) -> Self {
        Self {
            weights: vec![0.0; num_features as usize],
            bias: 0.0,
            learning_rate: 1.0,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn score(&self, data: &Sample) -> f64 {
        data.features()
            .iter()
            .filter_map(|&f| self.weights.get(f as usize))
            .sum::<f64>()
            + self.bias
    }
}

impl Classifier for Perceptron {
    fn predict(&self, data: &Sample) -> Label {
        u8::from(self.score(data) > 0.0)
    }

    /// Mistake-driven update; correct predictions leave the weights alone
    fn update(&mut self, data: &Sample, classification: Label) {
        let target = u8::from(classification != 0);
        if self.predict(data) == target {
            return;
        }
        let step = if target == 1 { self.learning_rate } else { -self.learning_rate };
        for &f in data.features() {
            if let Some(w) = self.weights.get_mut(f as usize) {
                *w += step;
            }
        }
        self.bias += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_predicts_negative() {
        let model = Perceptron::new(10);
        assert_eq!(model.predict(&Sample::new(vec![1, 2])), 0);
    }

    #[test]
    fn test_learns_separable_data() {
        let mut model = Perceptron::new(10);
        let data = vec![
            (Sample::new(vec![0, 1]), 0),
            (Sample::new(vec![1, 2]), 0),
            (Sample::new(vec![6, 7]), 1),
            (Sample::new(vec![7, 8]), 1),
        ];
        for _ in 0..10 {
            for (sample, label) in &data {
                model.update(sample, *label);
            }
        }
        assert_eq!(model.evaluate(&data), 1.0);
    }

    #[test]
    fn test_learning_rate_scales_step() {
        let mut model = Perceptron::new(4).with_learning_rate(0.25);
        model.update(&Sample::new(vec![1, 2]), 1);
        assert_eq!(model.weights, vec![0.0, 0.25, 0.25, 0.0]);
        assert_eq!(model.bias, 0.25);

        // Already correct
        model.update(&Sample::new(vec![1, 2]), 1);
        assert_eq!(model.bias, 0.25);
    }

    #[test]
    fn test_out_of_range_features_ignored() {
        let mut model = Perceptron::new(4);
        model.update(&Sample::new(vec![100]), 1);
        assert_eq!(model.predict(&Sample::new(vec![100])), 1);
    }

    #[test]
    fn test_evaluate_empty() {
        assert_eq!(Perceptron::new(4).evaluate(&[]), 0.0);
    }
}
