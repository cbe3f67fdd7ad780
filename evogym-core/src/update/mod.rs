//! Turns particle fitness into the weights used to blend their noise

use std::cmp::Ordering::Equal;
use std::fmt;
use std::str::FromStr;

use float_ord::FloatOrd;

use crate::error::ConfigError;
use crate::model::WeightUpdater;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
/// How the fitness of a population is combined into an update
pub enum UpdateRule {
    /// Z-whitened fitness, averaged over the population
    Weighted,
    /// Rank-based fitness shaping
    Shaped,
    /// Blends only the K fittest particles with log-decaying weights
    Elite(usize),
    /// Fitness used as-is, averaged over the population
    Raw,
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule::Weighted
    }
}

impl FromStr for UpdateRule {
    type Err = ConfigError;

    /// Parses `weighted`, `shaped`, `raw`, `elite` (top 1) or `elite:<k>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownUpdateRule(s.into());
        let mut parts = s.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some("weighted"), None) => Ok(UpdateRule::Weighted),
            (Some("shaped"), None) => Ok(UpdateRule::Shaped),
            (Some("raw"), None) => Ok(UpdateRule::Raw),
            (Some("elite"), None) => Ok(UpdateRule::Elite(1)),
            (Some("elite"), Some(k)) => match k.parse() {
                Ok(k) if k > 0 => Ok(UpdateRule::Elite(k)),
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UpdateRule::Weighted => write!(f, "weighted"),
            UpdateRule::Shaped => write!(f, "shaped"),
            UpdateRule::Elite(k) => write!(f, "elite:{}", k),
            UpdateRule::Raw => write!(f, "raw"),
        }
    }
}

impl UpdateRule {
    /// Weight of each particle's noise in the update, in population order
    pub fn weights(&self, fitness: &[f32]) -> Vec<f32> {
        let mut scores = fitness.to_vec();
        if scores.is_empty() {
            return scores;
        }
        let n = scores.len() as f32;
        match self {
            UpdateRule::Weighted => {
                normalize_weights(&mut scores, 1.0);
                scores.iter_mut().for_each(|s| *s /= n);
            }
            UpdateRule::Shaped => fitness_shape(&mut scores),
            UpdateRule::Elite(k) => elite_weights(&mut scores, *k),
            UpdateRule::Raw => scores.iter_mut().for_each(|s| *s /= n),
        }
        scores
    }
}

// Takes a list of scores and, in effect, performs z-whitening, scaling
// the results by alpha.  Identical scores all get a weight of one.
fn normalize_weights(scores: &mut [f32], alpha: f32) {
    let n_scores = scores.len() as f32;

    let sum: f32 = scores.iter().sum();
    let mu = sum / n_scores;
    let var: f32 = scores.iter().map(|v| (v - mu).powi(2)).sum::<f32>() / n_scores;
    let std = var.sqrt();

    if std == 0f32 {
        for s in scores.iter_mut() {
            *s = 1f32;
        }
    } else {
        // Epsilon keeps a near-zero deviation from blowing up the weights
        let denom = std + 1e-6;
        for s in scores.iter_mut() {
            *s = alpha * (*s - mu) / denom;
        }
    }
}

// Reweights the scores based on rank-based fitness shaping
fn fitness_shape(scores: &mut [f32]) {
    let mut i_scores: Vec<_> = scores.iter().cloned().enumerate().collect();
    i_scores.sort_by_key(|(_i, x)| FloatOrd(-*x));

    let len = scores.len();
    let log_len = (len as f32 / 2. + 1.).ln();
    let mut sum = 0.;
    for (rank, (i, _s)) in i_scores.into_iter().enumerate() {
        let nom = (0f32).max(log_len - ((rank + 1) as f32).ln());
        scores[i] = nom;
        sum += nom;
    }
    for s in scores.iter_mut() {
        *s = *s / sum - 1. / len as f32;
    }
}

// Precomputes the log-decaying weights for the top `size` ranks
fn build_weights(size: usize) -> Vec<f32> {
    let fsize = size as f32;
    let noms: Vec<f32> = (1..(size + 1))
        .map(|i| (fsize + 0.5).ln() - (i as f32).ln())
        .collect();

    let denom: f32 = noms.iter().sum();
    noms.into_iter().map(|x| x / denom).collect()
}

// Top k particles get the rank weights, everyone else zero
fn elite_weights(scores: &mut [f32], k: usize) {
    let k = k.min(scores.len());
    let weights = build_weights(k);
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&x, &y| scores[y].partial_cmp(&scores[x]).unwrap_or(Equal));
    let mut out = vec![0f32; scores.len()];
    for (rank, &i) in order.iter().take(k).enumerate() {
        out[i] = weights[rank];
    }
    scores.copy_from_slice(&out);
}

/// Geometric decay of the learning rate and noise scale
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    /// Current learning rate
    pub lr: f32,
    /// Current noise scale
    pub sigma: f32,
    /// Multiplier applied on decay
    pub decay: f32,
    /// Decay fires on episodes whose 1-indexed count is a multiple of this
    pub decay_step: usize,
}

impl Schedule {
    /// Applies decay for the 0-indexed `episode`, returning whether it fired
    pub fn advance(&mut self, episode: usize) -> bool {
        if (episode + 1) % self.decay_step == 0 {
            self.lr *= self.decay;
            self.sigma *= self.decay;
            true
        } else {
            false
        }
    }
}

// Contains the momentum vector
pub(crate) struct Momentum<G: WeightUpdater> {
    pub(crate) gradient: G,
    pub(crate) mu: f32,
}

impl<G: WeightUpdater> Momentum<G> {
    // m = mu * m + g, then g = m
    pub(crate) fn update(&mut self, new_gradient: &mut G) {
        self.gradient.scale_gradients(self.mu);
        self.gradient.add_gradients(new_gradient);
        self.gradient.copy_gradients(new_gradient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vectors(expected: &[f32], actual: &[f32]) {
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual) {
            assert!((e - a).abs() < 1e-5, "{:?} != {:?}", expected, actual);
        }
    }

    #[test]
    fn test_fitness_shape() {
        let mut scores = vec![0f32, 0.1, 0.05, 0.7, 0.2];
        fitness_shape(&mut scores);
        let expected = [-0.2, -0.12161282, -0.2, 0.43704253, 0.084570274];
        assert_vectors(&expected, &scores);
    }

    #[test]
    fn test_znorm() {
        let mut scores = vec![-1.0, 0.0, 0.5];
        normalize_weights(&mut scores, 1.0);
        assert_vectors(&[-1.33630621, 0.26726124, 1.06904497], &scores);
    }

    #[test]
    fn test_weighted() {
        let w = UpdateRule::Weighted.weights(&[-1.0, 0.0, 0.5]);
        assert_vectors(&[-0.44543540, 0.08908708, 0.35634832], &w);

        // A single particle, or a flat population, gets an even share
        assert_vectors(&[1.0], &UpdateRule::Weighted.weights(&[3.0]));
        assert_vectors(&[0.5, 0.5], &UpdateRule::Weighted.weights(&[2.0, 2.0]));
    }

    #[test]
    fn test_elite() {
        let w = UpdateRule::Elite(2).weights(&[0.1, 3.0, 2.0, -1.0]);
        let top = build_weights(2);
        assert_vectors(&[0.0, top[0], top[1], 0.0], &w);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);

        // k larger than the population uses everyone
        let w = UpdateRule::Elite(10).weights(&[1.0, 2.0]);
        assert!(w.iter().all(|x| *x > 0.0));
        assert!(w[1] > w[0]);
    }

    #[test]
    fn test_raw() {
        assert_vectors(&[0.5, 1.0], &UpdateRule::Raw.weights(&[1.0, 2.0]));
        assert!(UpdateRule::Raw.weights(&[]).is_empty());
    }

    #[test]
    fn test_parse_rules() {
        assert_eq!("weighted".parse::<UpdateRule>(), Ok(UpdateRule::Weighted));
        assert_eq!("shaped".parse::<UpdateRule>(), Ok(UpdateRule::Shaped));
        assert_eq!("raw".parse::<UpdateRule>(), Ok(UpdateRule::Raw));
        assert_eq!("elite".parse::<UpdateRule>(), Ok(UpdateRule::Elite(1)));
        assert_eq!("elite:4".parse::<UpdateRule>(), Ok(UpdateRule::Elite(4)));
        assert!("elite:0".parse::<UpdateRule>().is_err());
        assert_eq!(
            "ranked".parse::<UpdateRule>(),
            Err(ConfigError::UnknownUpdateRule("ranked".into()))
        );
        assert_eq!(UpdateRule::Elite(3).to_string(), "elite:3");
    }

    #[test]
    fn test_schedule() {
        let mut s = Schedule {
            lr: 1.0,
            sigma: 0.4,
            decay: 0.5,
            decay_step: 2,
        };
        let fired: Vec<_> = (0..4).map(|ep| s.advance(ep)).collect();
        assert_eq!(fired, vec![false, true, false, true]);
        assert_eq!(s.lr, 0.25);
        assert_eq!(s.sigma, 0.1);
    }

    #[test]
    fn test_schedule_large_step_never_fires() {
        let mut s = Schedule {
            lr: 0.1,
            sigma: 0.1,
            decay: 0.5,
            decay_step: 1_000_000,
        };
        assert!((0..1000).all(|ep| !s.advance(ep)));
        assert_eq!(s.lr, 0.1);
    }
}
