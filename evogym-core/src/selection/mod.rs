use std::fmt;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::error::{ConfigError, DistributionError};

// How far the probabilities may drift from summing to one
const SUM_TOLERANCE: f32 = 1e-4;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// How an action is picked from the policy's scores
pub enum Selection {
    /// Highest score, lowest index on ties
    Max,
    /// Sample, treating the scores as probabilities
    Random,
}

impl FromStr for Selection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Selection::Max),
            "random" => Ok(Selection::Random),
            _ => Err(ConfigError::UnknownSelection(s.into())),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Selection::Max => write!(f, "max"),
            Selection::Random => write!(f, "random"),
        }
    }
}

/// Index of the largest score.  Ties resolve to the lowest index and NaNs are never
/// picked over a number.
pub fn argmax(scores: &[f32]) -> Result<usize, DistributionError> {
    if scores.is_empty() {
        return Err(DistributionError::Empty);
    }
    let mut best = 0;
    for i in 1..scores.len() {
        if scores[i] > scores[best] || scores[best].is_nan() {
            best = i;
        }
    }
    Ok(best)
}

/// Checks that `probs` is a probability distribution
pub fn validate(probs: &[f32]) -> Result<(), DistributionError> {
    if probs.is_empty() {
        return Err(DistributionError::Empty);
    }
    if let Some(i) = probs.iter().position(|p| !p.is_finite() || *p < 0.0) {
        return Err(DistributionError::InvalidProbability(i));
    }
    let sum: f32 = probs.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(DistributionError::BadSum(sum));
    }
    Ok(())
}

/// Picks actions from score vectors
pub struct ActionSelector {
    mode: Selection,
    rng: XorShiftRng,
}

impl ActionSelector {
    /// New selector; the seed only matters for `random`
    pub fn new(mode: Selection, seed: u64) -> Self {
        ActionSelector {
            mode,
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Current mode
    pub fn mode(&self) -> Selection {
        self.mode
    }

    /// Changes the mode, keeping the random stream
    pub fn set_mode(&mut self, mode: Selection) {
        self.mode = mode;
    }

    /// Maps scores to an action index
    pub fn select(&mut self, scores: &[f32]) -> Result<usize, DistributionError> {
        match self.mode {
            Selection::Max => argmax(scores),
            Selection::Random => {
                validate(scores)?;
                // Validation guarantees a positive total, so this can't fail
                let dist = WeightedIndex::<f32>::new(scores.iter().cloned())
                    .map_err(|_| DistributionError::BadSum(0.0))?;
                Ok(dist.sample(&mut self.rng))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("max".parse::<Selection>(), Ok(Selection::Max));
        assert_eq!("random".parse::<Selection>(), Ok(Selection::Random));
        assert_eq!(
            "softmax".parse::<Selection>(),
            Err(ConfigError::UnknownSelection("softmax".into()))
        );
    }

    #[test]
    fn test_max() {
        let mut sel = ActionSelector::new(Selection::Max, 0);
        assert_eq!(sel.select(&[0.1, 0.7, 0.2]), Ok(1));
        assert_eq!(sel.select(&[0.4, 0.1, 0.4]), Ok(0));
        assert_eq!(sel.select(&[-3.0, -1.0, -2.0]), Ok(1));
        assert_eq!(sel.select(&[]), Err(DistributionError::Empty));
    }

    #[test]
    fn test_random_degenerate() {
        let mut sel = ActionSelector::new(Selection::Random, 42);
        for _ in 0..10_000 {
            assert_eq!(sel.select(&[0.0, 1.0, 0.0]), Ok(1));
        }
    }

    #[test]
    fn test_random_frequencies() {
        let mut sel = ActionSelector::new(Selection::Random, 42);
        let mut counts = [0usize; 2];
        for _ in 0..10_000 {
            counts[sel.select(&[0.25, 0.75]).unwrap()] += 1;
        }
        assert!(counts[1] > 7000 && counts[1] < 8000);
    }

    #[test]
    fn test_random_rejects() {
        let mut sel = ActionSelector::new(Selection::Random, 42);
        assert_eq!(sel.select(&[0.2, 0.2]), Err(DistributionError::BadSum(0.4)));
        assert_eq!(
            sel.select(&[1.5, -0.5]),
            Err(DistributionError::InvalidProbability(1))
        );
        assert_eq!(
            sel.select(&[std::f32::NAN, 1.0]),
            Err(DistributionError::InvalidProbability(0))
        );
        assert_eq!(sel.select(&[]), Err(DistributionError::Empty));
    }
}
