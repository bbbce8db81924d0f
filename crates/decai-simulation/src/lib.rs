//! # DeCAI Simulation
//!
//! Drives the incentive mechanisms with simulated participants.
//!
//! ## Components
//!
//! - [`CollaborativeTrainer`]: Moves value between balances as the mechanism
//!   decides and keeps the model up to date
//! - [`Perceptron`]: Sparse binary classifier behind the [`Classifier`] seam
//! - [`Dataset`]: Seeded synthetic bag-of-words data
//! - [`Simulator`]: Discrete-event loop over [`Agent`]s
//! - [`SimulationConfig`]: Defaults, TOML file and `DECAI__` environment

pub mod agent;
pub mod config;
pub mod data;
pub mod model;
pub mod simulator;
pub mod trainer;

pub use agent::{default_agents, Agent};
pub use crate::config::{MechanismSettings, SimulationConfig};
pub use data::{DataConfig, Dataset, LabeledSample};
pub use model::{Classifier, Perceptron};
pub use simulator::{SimulationReport, SimulationStats, Simulator};
pub use trainer::CollaborativeTrainer;
