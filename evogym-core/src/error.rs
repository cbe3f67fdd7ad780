use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, PartialEq)]
/// Invalid solver or training settings.  Nothing is built or mutated when one of
/// these is returned.
pub enum ConfigError {
    /// Selection mode other than `max` or `random`
    UnknownSelection(String),
    /// Update rule name which isn't recognized
    UnknownUpdateRule(String),
    /// Policy shape doesn't match the environment
    Dimension {
        /// What the environment provides
        expected: (usize, usize),
        /// What the policy has, as (inputs, outputs)
        found: (usize, usize),
    },
    /// A training parameter is out of range
    InvalidParameter(&'static str),
    /// Model parameters whose internal shapes don't line up
    Malformed(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnknownSelection(s) => {
                write!(f, "selection must be one of [max, random], got `{}`", s)
            }
            ConfigError::UnknownUpdateRule(s) => write!(
                f,
                "update rule must be one of [weighted, shaped, raw, elite], got `{}`",
                s
            ),
            ConfigError::Dimension { expected, found } => write!(
                f,
                "policy maps {} inputs to {} actions but the environment has {} inputs and {} actions",
                found.0, found.1, expected.0, expected.1
            ),
            ConfigError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            ConfigError::Malformed(msg) => write!(f, "malformed model: {}", msg),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
/// Scores that can't be sampled from
pub enum DistributionError {
    /// No actions to choose from
    Empty,
    /// An entry is negative, NaN or infinite
    InvalidProbability(usize),
    /// Entries don't add up to one
    BadSum(f32),
}

impl fmt::Display for DistributionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistributionError::Empty => write!(f, "invalid distribution: no entries"),
            DistributionError::InvalidProbability(i) => {
                write!(f, "invalid distribution: bad probability at index {}", i)
            }
            DistributionError::BadSum(s) => {
                write!(f, "invalid distribution: probabilities sum to {}", s)
            }
        }
    }
}

impl Error for DistributionError {}

#[derive(Debug)]
/// Failure while running an episode
pub enum RolloutError<E> {
    /// Raised by the environment on reset or step
    Environment(E),
    /// Observation doesn't flatten to the state dimensionality
    Observation {
        /// State dimensionality
        expected: usize,
        /// Length of the observation received
        found: usize,
    },
    /// The policy output couldn't be sampled
    Distribution(DistributionError),
}

impl<E> From<DistributionError> for RolloutError<E> {
    fn from(e: DistributionError) -> Self {
        RolloutError::Distribution(e)
    }
}

impl<E: fmt::Display> fmt::Display for RolloutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RolloutError::Environment(e) => write!(f, "environment error: {}", e),
            RolloutError::Observation { expected, found } => write!(
                f,
                "observation has {} values, expected {}",
                found, expected
            ),
            RolloutError::Distribution(e) => e.fmt(f),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> Error for RolloutError<E> {}

#[derive(Debug)]
/// Failure while saving or loading a policy
pub enum PersistError {
    /// Error reading or writing
    Io(io::Error),
    /// Error in the json document
    Json(serde_json::Error),
    /// The stored model doesn't fit the solver
    Shape(ConfigError),
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Json(e)
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "io error: {}", e),
            PersistError::Json(e) => write!(f, "malformed policy document: {}", e),
            PersistError::Shape(e) => write!(f, "stored policy doesn't fit: {}", e),
        }
    }
}

impl Error for PersistError {}

#[derive(Debug)]
/// Failure during training
pub enum TrainError<E> {
    /// Bad training parameters
    Config(ConfigError),
    /// A rollout failed; the run is aborted
    Rollout(RolloutError<E>),
    /// The history sink couldn't be written
    History(io::Error),
}

impl<E> From<ConfigError> for TrainError<E> {
    fn from(e: ConfigError) -> Self {
        TrainError::Config(e)
    }
}

impl<E> From<RolloutError<E>> for TrainError<E> {
    fn from(e: RolloutError<E>) -> Self {
        TrainError::Rollout(e)
    }
}

impl<E> From<io::Error> for TrainError<E> {
    fn from(e: io::Error) -> Self {
        TrainError::History(e)
    }
}

impl<E: fmt::Display> fmt::Display for TrainError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrainError::Config(e) => e.fmt(f),
            TrainError::Rollout(e) => e.fmt(f),
            TrainError::History(e) => write!(f, "unable to write history: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> Error for TrainError<E> {}
