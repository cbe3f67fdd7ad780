//! The Evolutionary Strategies solver.
//!
//! Each training episode jitters the base policy into a population of particles,
//! rolls every particle out for a mini-batch of episodes, and blends the noise of the
//! population back into the base weighted by fitness.  Everything runs in sequence:
//! a particle finishes its batch before the next one starts and the base is only
//! touched once the whole population has been evaluated.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::mem;
use std::path::Path;
use std::time::SystemTime;

use crate::env::Environment;
use crate::error::{ConfigError, PersistError, RolloutError, TrainError};
use crate::history::{HistorySink, TrainingHistory};
use crate::model::sampler::{NoiseSampler, Particle};
use crate::model::{zeroed, Policy};
use crate::rollout::{rollout, select_action, EpisodeTrace};
use crate::selection::{ActionSelector, Selection};
use crate::update::{Momentum, Schedule, UpdateRule};

/// Settings for a training run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Number of training episodes
    pub episodes: usize,

    /// Learning rate
    pub lr: f32,

    /// Standard deviation of the particle noise
    pub sigma: f32,

    /// Rollouts per particle per episode
    pub batch_size: usize,

    /// Particles per episode
    pub population: usize,

    /// Multiplier for lr and sigma when decay fires
    pub decay: f32,

    /// Decay fires on episodes whose 1-indexed count is a multiple of this.  The
    /// default is large enough that it never fires in practice.
    pub decay_step: usize,

    /// How fitness is turned into an update
    pub update: UpdateRule,

    /// Maximum steps per rollout
    pub limit: Option<usize>,

    /// When provided, smooths updates with momentum
    pub momentum: Option<f32>,

    /// Number of episodes between progress lines.  Nothing is printed when omitted.
    pub report_iter: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            episodes: 100,
            lr: 1e-1,
            sigma: 1e-1,
            batch_size: 10,
            population: 10,
            decay: 1.0,
            decay_step: 1_000_000,
            update: UpdateRule::Weighted,
            limit: None,
            momentum: None,
            report_iter: None,
        }
    }
}

impl TrainConfig {
    /// Rejects settings the training loop can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population == 0 {
            return Err(ConfigError::InvalidParameter("population must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidParameter("batch size must be at least 1"));
        }
        if self.decay_step == 0 {
            return Err(ConfigError::InvalidParameter("decay step must be at least 1"));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(ConfigError::InvalidParameter("sigma must be finite and >= 0"));
        }
        if !self.lr.is_finite() || !self.decay.is_finite() {
            return Err(ConfigError::InvalidParameter("lr and decay must be finite"));
        }
        if let Some(mu) = self.momentum {
            if !mu.is_finite() {
                return Err(ConfigError::InvalidParameter("momentum must be finite"));
            }
        }
        if let UpdateRule::Elite(0) = self.update {
            return Err(ConfigError::InvalidParameter("elite needs at least one parent"));
        }
        Ok(())
    }
}

/// Which parameters drive a rollout
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    /// The base policy
    Base,
    /// A particle of the current population
    Particle(usize),
}

/// Fixed description of the problem, stored alongside saved policies
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Action selection mode
    pub selection: Selection,
    /// Flattened observation size
    pub state_space: usize,
    /// Number of discrete actions
    pub action_space: usize,
}

/// Evaluation of one particle over its mini-batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleScore {
    /// Sum of the batch's episode rewards
    pub fitness: f32,
    /// Mean episode length over the batch
    pub time: f32,
}

// On-disk layout of a saved policy
#[derive(Serialize, Deserialize)]
struct PolicyDocument<M> {
    selection: Selection,
    state_space: usize,
    action_space: usize,
    model: M,
}

/// Trains a policy against an environment
pub struct Solver<E, M> {
    env: E,
    policy: M,
    config: SolverConfig,
    selector: ActionSelector,
    sampler: NoiseSampler,
    population: Vec<Particle<M>>,
    history: TrainingHistory,
}

fn check_dims<M: Policy>(
    policy: &M,
    state_space: usize,
    action_space: usize,
) -> Result<(), ConfigError> {
    if policy.input_dims() != state_space || policy.output_dims() != action_space {
        Err(ConfigError::Dimension {
            expected: (state_space, action_space),
            found: (policy.input_dims(), policy.output_dims()),
        })
    } else {
        Ok(())
    }
}

// Resolves a source to its parameters
fn source_params<'a, M>(policy: &'a M, population: &'a [Particle<M>], source: Source) -> &'a M {
    match source {
        Source::Base => policy,
        Source::Particle(i) => &population[i].params,
    }
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f32>() / xs.len() as f32
    }
}

impl<E: Environment, M: Policy> Solver<E, M> {
    /// Builds a solver.  `selection` must be `max` or `random`, and the policy must map
    /// the environment's flattened observation to one score per action.
    pub fn new(env: E, policy: M, selection: &str, seed: u64) -> Result<Self, ConfigError> {
        let selection: Selection = selection.parse()?;
        let config = SolverConfig {
            selection,
            state_space: env.state_dims(),
            action_space: env.action_count(),
        };
        check_dims(&policy, config.state_space, config.action_space)?;

        Ok(Solver {
            env,
            policy,
            config,
            selector: ActionSelector::new(selection, seed),
            sampler: NoiseSampler::new(seed.wrapping_add(1)),
            population: Vec::new(),
            history: TrainingHistory::default(),
        })
    }

    /// Perturbs only a `p` fraction of the weights in each particle.  `p` must be in
    /// (0, 1].
    pub fn with_mask(mut self, p: f32) -> Result<Self, ConfigError> {
        self.sampler = self.sampler.with_mask(p)?;
        Ok(self)
    }

    /// Current base policy
    pub fn policy(&self) -> &M {
        &self.policy
    }

    /// Problem description
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Statistics of every training episode so far
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// The wrapped environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Particles of the current population, empty between training episodes
    pub fn population(&self) -> &[Particle<M>] {
        &self.population
    }

    /// Replaces the population with `count` fresh particles around the base
    pub fn jitter(&mut self, sigma: f32, count: usize) {
        self.population = self.sampler.jitter(&self.policy, sigma, count);
    }

    /// Picks an action for a flattened observation
    pub fn select_action(
        &mut self,
        state: &[f32],
        source: Source,
    ) -> Result<usize, RolloutError<E::Error>> {
        let model = source_params(&self.policy, &self.population, source);
        select_action(model, &mut self.selector, state, self.config.state_space)
    }

    /// Runs a single episode with the given parameters.  Panics if a particle index is
    /// out of range for the current population.
    pub fn pathfind(
        &mut self,
        source: Source,
        limit: Option<usize>,
    ) -> Result<EpisodeTrace, RolloutError<E::Error>> {
        let model = source_params(&self.policy, &self.population, source);
        rollout(
            &mut self.env,
            model,
            &mut self.selector,
            self.config.state_space,
            limit,
        )
    }

    /// Rolls a particle out `batch_size` times.  Fitness is the summed reward and time
    /// the mean episode length.
    pub fn evaluate_particle(
        &mut self,
        idx: usize,
        batch_size: usize,
        limit: Option<usize>,
    ) -> Result<ParticleScore, RolloutError<E::Error>> {
        let mut rewards = Vec::with_capacity(batch_size);
        let mut times = Vec::with_capacity(batch_size);
        while rewards.len() < batch_size {
            let trace = self.pathfind(Source::Particle(idx), limit)?;
            rewards.push(trace.total_reward());
            times.push(trace.time as f32);
        }
        Ok(ParticleScore {
            fitness: rewards.iter().sum(),
            time: mean(&times),
        })
    }

    /// Greedy or sampled rollouts of the base policy, depending on the selection mode
    pub fn evaluate(
        &mut self,
        episodes: usize,
        limit: Option<usize>,
    ) -> Result<Vec<EpisodeTrace>, RolloutError<E::Error>> {
        (0..episodes).map(|_| self.pathfind(Source::Base, limit)).collect()
    }

    // Blends the population's noise into the base
    fn step(
        &mut self,
        fitness: &[f32],
        lr: f32,
        rule: UpdateRule,
        mom: &mut Option<Momentum<M>>,
    ) {
        let weights = rule.weights(fitness);
        let mut gradient = zeroed(&self.policy);
        for (particle, w) in self.population.iter_mut().zip(weights.iter()) {
            particle.noise.scale_gradients(lr * w);
            gradient.add_gradients(&particle.noise);
        }

        if let Some(m) = mom.as_mut() {
            m.update(&mut gradient);
        }

        let mut next = zeroed(&self.policy);
        self.policy.update(&gradient, &mut next);
        mem::swap(&mut self.policy, &mut next);
        self.population.clear();
    }

    /// Trains the base policy, appending one history entry per episode.  When a sink
    /// is provided it sees every episode and gets the cumulative history after each
    /// episode and once more at the end.  Any environment failure aborts the run.
    pub fn train(
        &mut self,
        cfg: &TrainConfig,
        mut sink: Option<&mut dyn HistorySink>,
    ) -> Result<(), TrainError<E::Error>> {
        cfg.validate()?;

        let mut schedule = Schedule {
            lr: cfg.lr,
            sigma: cfg.sigma,
            decay: cfg.decay,
            decay_step: cfg.decay_step,
        };
        let mut mom = cfg.momentum.map(|mu| Momentum {
            gradient: zeroed(&self.policy),
            mu,
        });

        let now = SystemTime::now();

        for episode in 0..cfg.episodes {
            schedule.advance(episode);

            self.jitter(schedule.sigma, cfg.population);

            let mut fitness = Vec::with_capacity(cfg.population);
            let mut times = Vec::with_capacity(cfg.population);
            for i in 0..cfg.population {
                let score = self.evaluate_particle(i, cfg.batch_size, cfg.limit)?;
                fitness.push(score.fitness);
                times.push(score.time);
            }

            let (time, reward) = (mean(&times), mean(&fitness));
            self.history.push(time, reward);

            self.step(&fitness, schedule.lr, cfg.update, &mut mom);

            if let Some(s) = sink.as_mut() {
                s.observe(episode, time, reward);
                s.flush(&self.history)?;
            }

            match cfg.report_iter {
                Some(r) if r > 0 && episode % r == 0 => {
                    let (s, m) = now
                        .elapsed()
                        .map(|e| (e.as_secs(), e.subsec_millis()))
                        .unwrap_or((0, 0));
                    println!(
                        "Time: {}.{:03},\tEpisode: {},\tReward: {},\tSteps: {},\tLR: {},\tSigma: {}",
                        s, m, episode, reward, time, schedule.lr, schedule.sigma
                    );
                }
                _ => (),
            }
        }

        if let Some(s) = sink.as_mut() {
            s.flush(&self.history)?;
        }
        Ok(())
    }

    /// Writes the policy and solver config as a single json document
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), PersistError> {
        let doc = PolicyDocument {
            selection: self.config.selection,
            state_space: self.config.state_space,
            action_space: self.config.action_space,
            model: &self.policy,
        };
        serde_json::to_writer(writer, &doc)?;
        Ok(())
    }

    /// Saves to a file
    pub fn save_path<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.save(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Replaces the policy and solver config with a saved document.  The whole document
    /// is read, the model's internal shapes validated and its dimensions checked against
    /// the environment first; on error nothing changes.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<(), PersistError> {
        let doc: PolicyDocument<M> = serde_json::from_reader(reader)?;
        doc.model.validate().map_err(PersistError::Shape)?;
        check_dims(&doc.model, doc.state_space, doc.action_space).map_err(PersistError::Shape)?;
        check_dims(&doc.model, self.env.state_dims(), self.env.action_count())
            .map_err(PersistError::Shape)?;

        self.policy = doc.model;
        self.config = SolverConfig {
            selection: doc.selection,
            state_space: doc.state_space,
            action_space: doc.action_space,
        };
        self.selector.set_mode(doc.selection);
        self.population.clear();
        Ok(())
    }

    /// Loads from a file
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PersistError> {
        let mut r = BufReader::new(File::open(path)?);
        self.load(&mut r)
    }
}
