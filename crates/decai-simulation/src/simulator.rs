//! Discrete-event simulator
//!
//! Agents act after exponentially distributed waits. Contributors stake a
//! normally distributed deposit with each submission; callers pay to query
//! the model. Every accepted submission schedules two follow-ups:
//! - the contributor asks for a refund once the refund window opens
//! - the first good agent other than the contributor reports the record
//!   once the any-address window opens
//!
//! Everything is driven from one seeded `StdRng` and one `Clock`, so a
//! configuration always produces the same report.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use decai_common::{Address, Balances, Clock, DecaiError, MechanismError, Msg, Result, Timestamp};
use decai_incentive::DataKey;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::SimulationConfig;
use crate::data::{flip, Dataset, LabeledSample};
use crate::model::{Classifier, Perceptron};
use crate::trainer::CollaborativeTrainer;

/// Decimal places kept on sampled deposits
const DEPOSIT_SCALE: u32 = 2;

/// A sampled deposit as a value, clamped at zero
fn deposit_amount(sampled: f64) -> Option<Decimal> {
    Decimal::from_f64(sampled.max(0.0)).map(|d| d.round_dp(DEPOSIT_SCALE))
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub submissions_accepted: u64,
    pub submissions_rejected: u64,
    pub predictions: u64,
    pub predictions_rejected: u64,
    /// Refunds that paid something
    pub refunds: u64,
    pub refunded: Decimal,
    /// Reports that paid something
    pub reports: u64,
    pub reported: Decimal,
    pub fees_paid: Decimal,
    pub fees_claimed: Decimal,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub mechanism: String,
    pub seed: u64,
    pub duration_s: u64,
    /// Hold-out accuracy after the owner's initial training
    pub initial_accuracy: f64,
    pub final_accuracy: f64,
    /// Final balance of every agent
    pub balances: BTreeMap<Address, Decimal>,
    /// Value held by the mechanism at the end
    pub custody: Decimal,
    pub records: usize,
    pub stats: SimulationStats,
    /// No value was created or destroyed anywhere
    pub conserved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Act { agent: usize },
    Refund { agent: usize, key: DataKey },
    Report { contributor: usize, key: DataKey },
}

#[derive(Debug, PartialEq, Eq)]
struct Scheduled {
    at: Timestamp,
    seq: u64,
    event: Event,
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

struct AgentState {
    agent: Agent,
    wait: Exp<f64>,
    deposit: Normal<f64>,
}

impl AgentState {
    fn new(agent: Agent) -> Result<Self> {
        let wait = Exp::new(1.0 / agent.mean_update_wait_s).map_err(|e| {
            DecaiError::Config(format!("agent {}: invalid wait distribution: {}", agent.address, e))
        })?;
        let deposit = Normal::new(agent.mean_deposit, agent.stdev_deposit).map_err(|e| {
            DecaiError::Config(format!("agent {}: invalid deposit distribution: {}", agent.address, e))
        })?;
        Ok(Self { agent, wait, deposit })
    }
}

/// Runs one configuration
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run to `duration_s` and report
    pub fn run(&self) -> Result<SimulationReport> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let dataset = Dataset::generate(&config.data, &mut rng);

        let clock = Clock::new();
        let mechanism = config.mechanism.build(clock.clone())?;

        let mut balances = Balances::new();
        for agent in &config.agents {
            balances.initialize(agent.address.clone(), agent.start_balance)?;
        }
        let initial_total = balances.total();

        let mut trainer = CollaborativeTrainer::new(
            balances,
            mechanism,
            Box::new(Perceptron::new(config.data.num_features).with_learning_rate(config.learning_rate)),
        );

        let init_len = (dataset.train.len() as f64 * config.init_train_data_portion).floor() as usize;
        let (init, pool) = dataset.train.split_at(init_len);
        for (data, label) in init {
            trainer.train_unstaked(data, *label);
        }
        let initial_accuracy = trainer.model().evaluate(&dataset.test);
        info!(
            mechanism = config.mechanism.kind(),
            seed = config.seed,
            initial_accuracy,
            "Starting simulation"
        );

        let agents = config
            .agents
            .iter()
            .cloned()
            .map(AgentState::new)
            .collect::<Result<Vec<_>>>()?;

        let mut run = Run {
            clock,
            rng,
            trainer,
            agents,
            pool,
            test: &dataset.test,
            queue: BinaryHeap::new(),
            seq: 0,
            stats: SimulationStats::default(),
        };
        run.execute(config.duration_s)?;

        let Run { trainer, stats, .. } = run;
        let final_accuracy = trainer.model().evaluate(&dataset.test);
        let balances = config
            .agents
            .iter()
            .map(|agent| (agent.address.clone(), trainer.balances().get(&agent.address)))
            .collect();
        let ledger = trainer.mechanism().ledger();
        let report = SimulationReport {
            mechanism: config.mechanism.kind().to_string(),
            seed: config.seed,
            duration_s: config.duration_s,
            initial_accuracy,
            final_accuracy,
            balances,
            custody: ledger.custody(),
            records: ledger.registry().len(),
            conserved: trainer.is_conserved() && trainer.balances().total() == initial_total,
            stats,
        };

        info!(
            final_accuracy,
            custody = %report.custody,
            records = report.records,
            conserved = report.conserved,
            "Simulation finished"
        );
        Ok(report)
    }
}

struct Run<'d> {
    clock: Clock,
    rng: StdRng,
    trainer: CollaborativeTrainer,
    agents: Vec<AgentState>,
    pool: &'d [LabeledSample],
    test: &'d [LabeledSample],
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
    stats: SimulationStats,
}

impl Run<'_> {
    fn execute(&mut self, duration_s: u64) -> Result<()> {
        for agent in 0..self.agents.len() {
            self.schedule_next_action(agent);
        }

        while let Some(Reverse(next)) = self.queue.pop() {
            if next.at > duration_s {
                break;
            }
            self.clock.set(next.at);
            match next.event {
                Event::Act { agent } => {
                    self.act(agent);
                    self.schedule_next_action(agent);
                }
                Event::Refund { agent, key } => self.refund(agent, &key),
                Event::Report { contributor, key } => self.report(contributor, &key),
            }
        }
        self.clock.set(duration_s);

        for idx in 0..self.agents.len() {
            let address = self.agents[idx].agent.address.clone();
            self.stats.fees_claimed += self.trainer.claim_prediction_fees(&address)?;
        }
        Ok(())
    }

    fn schedule(&mut self, at: Timestamp, event: Event) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            at,
            seq: self.seq,
            event,
        }));
    }

    fn schedule_next_action(&mut self, agent: usize) {
        let wait = self.agents[agent].wait.sample(&mut self.rng).round().max(1.0) as u64;
        let at = self.clock.now().saturating_add(wait);
        self.schedule(at, Event::Act { agent });
    }

    fn act(&mut self, agent: usize) {
        if self.agents[agent].agent.calls_model {
            match self.call_model(agent) {
                Ok(()) => self.stats.predictions += 1,
                Err(err) => {
                    self.stats.predictions_rejected += 1;
                    debug!(agent = %self.agents[agent].agent.address, %err, "Prediction rejected");
                }
            }
        } else {
            match self.contribute(agent) {
                Ok(()) => self.stats.submissions_accepted += 1,
                Err(err) => {
                    self.stats.submissions_rejected += 1;
                    debug!(agent = %self.agents[agent].agent.address, %err, "Submission rejected");
                }
            }
        }
    }

    fn contribute(&mut self, agent: usize) -> Result<()> {
        let pool = self.pool;
        let (data, true_label) = &pool[self.rng.gen_range(0..pool.len())];
        let state = &self.agents[agent];
        let label = if !state.agent.good || self.rng.gen_bool(state.agent.prob_mistake) {
            flip(*true_label)
        } else {
            *true_label
        };
        let sampled = state.deposit.sample(&mut self.rng);
        let Some(deposit) = deposit_amount(sampled) else {
            warn!(agent = %state.agent.address, sampled, "Sampled deposit is not representable");
            return Err(MechanismError::rejected(format!("sampled deposit {} is not representable", sampled)).into());
        };

        let msg = Msg::new(state.agent.address.clone(), deposit)?;
        let outcome = self.trainer.add_data(&msg, data, label)?;

        let now = self.clock.now();
        let windows = *self.trainer.mechanism().config();
        if let Some(at) = windows.refund_time_s.opens_at(now) {
            self.schedule(at, Event::Refund { agent, key: outcome.key });
        }
        if let Some(at) = windows.any_address_claim_wait_time_s.opens_at(now) {
            self.schedule(
                at,
                Event::Report {
                    contributor: agent,
                    key: outcome.key,
                },
            );
        }
        Ok(())
    }

    fn call_model(&mut self, agent: usize) -> Result<()> {
        let test = self.test;
        let (data, _) = &test[self.rng.gen_range(0..test.len())];
        let state = &self.agents[agent];
        let msg = Msg::new(state.agent.address.clone(), state.agent.pay_to_call)?;
        self.trainer.predict(&msg, data)?;
        self.stats.fees_paid += msg.value;
        Ok(())
    }

    fn refund(&mut self, agent: usize, key: &DataKey) {
        let address = self.agents[agent].agent.address.clone();
        match self.trainer.refund(&address, key) {
            Ok(amount) if !amount.is_zero() => {
                self.stats.refunds += 1;
                self.stats.refunded += amount;
            }
            Ok(_) => debug!(%address, %key, "Nothing refunded"),
            Err(err) => warn!(%address, %key, %err, "Refund failed"),
        }
    }

    fn report(&mut self, contributor: usize, key: &DataKey) {
        let Some(reporter) = self
            .agents
            .iter()
            .enumerate()
            .find(|(idx, state)| *idx != contributor && state.agent.reports_others())
            .map(|(_, state)| state.agent.address.clone())
        else {
            return;
        };

        match self.trainer.report(&reporter, key) {
            Ok(amount) if !amount.is_zero() => {
                self.stats.reports += 1;
                self.stats.reported += amount;
            }
            Ok(_) => {}
            Err(err) => warn!(%reporter, %key, %err, "Report failed"),
        }
    }
}
