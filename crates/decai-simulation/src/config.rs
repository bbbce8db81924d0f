//! Simulation configuration
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `DECAI__`-prefixed environment variables, `__` separating nested keys
//!    (e.g. `DECAI__DURATION_S=86400`, `DECAI__DATA__SIGNAL=0.7`)

use std::collections::HashSet;

use anyhow::Result;
use decai_common::{Clock, DecaiError, MechanismError, DAY_S};
use decai_incentive::{
    FreeMechanism, IncentiveMechanism, MechanismConfig, PooledFee, PooledFeeConfig, Stakeable,
    StakeableConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{default_agents, Agent};
use crate::data::DataConfig;

/// Which incentive mechanism to run, with its settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MechanismSettings {
    Stakeable(StakeableConfig),
    Free(MechanismConfig),
    PooledFee(PooledFeeConfig),
}

impl Default for MechanismSettings {
    fn default() -> Self {
        MechanismSettings::Stakeable(StakeableConfig::default())
    }
}

impl MechanismSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            MechanismSettings::Stakeable(_) => "stakeable",
            MechanismSettings::Free(_) => "free",
            MechanismSettings::PooledFee(_) => "pooled_fee",
        }
    }

    /// Construct the mechanism on `clock`
    pub fn build(&self, clock: Clock) -> Result<Box<dyn IncentiveMechanism>, MechanismError> {
        let mechanism: Box<dyn IncentiveMechanism> = match self {
            MechanismSettings::Stakeable(config) => Box::new(Stakeable::new(config.clone(), clock)?),
            MechanismSettings::Free(config) => Box::new(FreeMechanism::with_config(*config, clock)?),
            MechanismSettings::PooledFee(config) => Box::new(PooledFee::new(config.clone(), clock)?),
        };
        Ok(mechanism)
    }

    fn windows(&self) -> &MechanismConfig {
        match self {
            MechanismSettings::Stakeable(config) => &config.mechanism,
            MechanismSettings::Free(config) => config,
            MechanismSettings::PooledFee(config) => &config.mechanism,
        }
    }
}

/// Simulation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for data generation and agent behavior
    pub seed: u64,
    /// Logical seconds to simulate
    pub duration_s: u64,
    /// Share of the training set the owner trains on before opening up
    pub init_train_data_portion: f64,
    /// Perceptron step size
    pub learning_rate: f64,
    pub mechanism: MechanismSettings,
    pub data: DataConfig,
    pub agents: Vec<Agent>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0xdeca1,
            duration_s: 14 * DAY_S,
            init_train_data_portion: 0.08,
            learning_rate: 1.0,
            mechanism: MechanismSettings::default(),
            data: DataConfig::default(),
            agents: default_agents(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from `.env`, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }
        let cfg: Self = builder
            .add_source(
                ::config::Environment::with_prefix("DECAI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        debug!(?cfg, "Loaded configuration");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), DecaiError> {
        if self.duration_s == 0 {
            return Err(DecaiError::Config("duration_s must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.init_train_data_portion) {
            return Err(DecaiError::Config(format!(
                "init_train_data_portion must be within [0, 1), got {}",
                self.init_train_data_portion
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(DecaiError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.agents.is_empty() {
            return Err(DecaiError::Config("at least one agent is required".into()));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            agent.validate()?;
            if !seen.insert(&agent.address) {
                return Err(DecaiError::Config(format!("duplicate agent address {}", agent.address)));
            }
        }

        self.data.validate()?;
        self.mechanism.windows().validate()?;
        Ok(())
    }
}
