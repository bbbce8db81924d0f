//! Simulated participants

use decai_common::{Address, DecaiError, HOUR_S};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One participant and how it behaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub address: Address,
    pub start_balance: Decimal,
    /// Mean of the normally distributed deposit sent with each submission
    pub mean_deposit: f64,
    pub stdev_deposit: f64,
    /// Mean of the exponentially distributed wait between actions
    pub mean_update_wait_s: f64,
    /// Probability a good agent submits the wrong label by accident
    #[serde(default)]
    pub prob_mistake: f64,
    /// Good agents submit true labels and report other agents' data
    #[serde(default = "default_good")]
    pub good: bool,
    /// Callers only query the model
    #[serde(default)]
    pub calls_model: bool,
    /// Fee sent with each query
    #[serde(default)]
    pub pay_to_call: Decimal,
}

fn default_good() -> bool {
    true
}

impl Agent {
    /// An honest contributor
    pub fn good(address: impl Into<Address>, start_balance: Decimal) -> Self {
        Self {
            address: address.into(),
            start_balance,
            mean_deposit: 50.0,
            stdev_deposit: 10.0,
            mean_update_wait_s: 10.0 * 60.0,
            prob_mistake: 0.0001,
            good: true,
            calls_model: false,
            pay_to_call: Decimal::ZERO,
        }
    }

    /// A contributor that always submits the wrong label
    pub fn malicious(address: impl Into<Address>, start_balance: Decimal) -> Self {
        Self {
            address: address.into(),
            start_balance,
            mean_deposit: 100.0,
            stdev_deposit: 3.0,
            mean_update_wait_s: HOUR_S as f64,
            prob_mistake: 0.0,
            good: false,
            calls_model: false,
            pay_to_call: Decimal::ZERO,
        }
    }

    /// Someone who only pays to query the model
    pub fn caller(address: impl Into<Address>, start_balance: Decimal, pay_to_call: Decimal) -> Self {
        Self {
            address: address.into(),
            start_balance,
            mean_deposit: 0.0,
            stdev_deposit: 0.0,
            mean_update_wait_s: 2.0 * HOUR_S as f64,
            prob_mistake: 0.0,
            good: true,
            calls_model: true,
            pay_to_call,
        }
    }

    /// Whether this agent sweeps other agents' stale data
    pub fn reports_others(&self) -> bool {
        self.good && !self.calls_model
    }

    pub fn validate(&self) -> Result<(), DecaiError> {
        let invalid = |what: &str| {
            Err(DecaiError::Config(format!("agent {}: {}", self.address, what)))
        };
        if self.start_balance < Decimal::ZERO {
            return invalid("start_balance must not be negative");
        }
        if !(self.mean_deposit >= 0.0) || !(self.stdev_deposit >= 0.0) {
            return invalid("deposit distribution must be non-negative");
        }
        if !(self.mean_deposit + DEPOSIT_SPREAD * self.stdev_deposit <= MAX_DEPOSIT) {
            return invalid("deposit distribution exceeds the largest representable deposit");
        }
        if !(self.mean_update_wait_s > 0.0) {
            return invalid("mean_update_wait_s must be positive");
        }
        if !(0.0..=1.0).contains(&self.prob_mistake) {
            return invalid("prob_mistake must be within [0, 1]");
        }
        if self.pay_to_call < Decimal::ZERO {
            return invalid("pay_to_call must not be negative");
        }
        Ok(())
    }
}

/// Largest deposit an agent may draw within [`DEPOSIT_SPREAD`] deviations of its mean
const MAX_DEPOSIT: f64 = 1e20;
const DEPOSIT_SPREAD: f64 = 6.0;

/// One honest and one malicious contributor
pub fn default_agents() -> Vec<Agent> {
    vec![
        Agent::good("Good", Decimal::from(10_000)),
        Agent::malicious("Bad", Decimal::from(10_000)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let agents = default_agents();
        assert_eq!(agents.len(), 2);
        assert!(agents[0].reports_others());
        assert!(!agents[1].reports_others());
        assert!(agents.iter().all(|a| a.validate().is_ok()));
    }

    #[test]
    fn test_caller_does_not_report() {
        let caller = Agent::caller("Caller", dec!(30000), dec!(50));
        assert!(caller.calls_model);
        assert!(!caller.reports_others());
    }

    #[test]
    fn test_validate() {
        let mut agent = Agent::good("Good", dec!(1));
        agent.mean_update_wait_s = 0.0;
        assert!(matches!(agent.validate(), Err(DecaiError::Config(_))));

        let mut agent = Agent::good("Good", dec!(1));
        agent.prob_mistake = 2.0;
        assert!(agent.validate().is_err());

        let mut agent = Agent::good("Good", dec!(1));
        agent.stdev_deposit = f64::NAN;
        assert!(agent.validate().is_err());

        let mut agent = Agent::good("Good", dec!(1));
        agent.mean_deposit = f64::INFINITY;
        assert!(agent.validate().is_err());

        let mut agent = Agent::good("Good", dec!(1));
        agent.stdev_deposit = 1e30;
        assert!(matches!(agent.validate(), Err(DecaiError::Config(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let agent: Agent = serde_json::from_str(
            r#"{"address": "Bad", "start_balance": "100", "mean_deposit": 5.0,
                "stdev_deposit": 1.0, "mean_update_wait_s": 60.0, "good": false}"#,
        )
        .unwrap();
        assert!(!agent.good);
        assert_eq!(agent.prob_mistake, 0.0);
        assert_eq!(agent.pay_to_call, Decimal::ZERO);
    }
}
