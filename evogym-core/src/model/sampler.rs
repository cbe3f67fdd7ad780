use rand::distributions::{Distribution, Normal, Uniform};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::error::ConfigError;
use crate::model::{GradientFuser, WeightUpdater};

/// A perturbed copy of the base policy, alive for a single training episode
#[derive(Clone, Debug)]
pub struct Particle<M> {
    /// Base parameters plus noise
    pub params: M,
    /// The noise which was added to the base
    pub noise: M,
}

/// Draws Gaussian noise for particles.  Noise is sampled from N(0, 1) and scaled by
/// sigma on the way out, so sigma may change between draws.
pub struct NoiseSampler {
    p: f32,
    n: Normal,
    uniform: Uniform<f32>,
    rng: XorShiftRng,
}

impl NoiseSampler {
    /// Creates a sampler which perturbs every weight
    pub fn new(seed: u64) -> Self {
        NoiseSampler {
            p: 1.0,
            n: Normal::new(0.0, 1.0),
            uniform: Uniform::new_inclusive(0.0, 1.0),
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Only perturbs each weight with probability `p`, which must be in (0, 1]; the
    /// rest get zero noise
    pub fn with_mask(mut self, p: f32) -> Result<Self, ConfigError> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(ConfigError::InvalidParameter("mask probability must be in (0, 1]"));
        }
        self.p = p;
        Ok(self)
    }

    /// Returns a model shaped like `like` where every weight is `sigma * N(0, 1)`
    pub fn noise<M: Clone + WeightUpdater>(&mut self, like: &M, sigma: f32) -> M {
        let mut g = like.clone();
        g.update_gradients(&mut || {
            if self.p == 1.0 || self.uniform.sample(&mut self.rng) < self.p {
                sigma * self.n.sample(&mut self.rng) as f32
            } else {
                0.0
            }
        });
        g
    }

    /// Builds `count` independent particles around `base`.  Each particle is a fresh
    /// copy of the base with its own noise added; `base` is never modified.
    pub fn jitter<M>(&mut self, base: &M, sigma: f32, count: usize) -> Vec<Particle<M>>
    where
        M: Clone + WeightUpdater + GradientFuser<M>,
    {
        (0..count)
            .map(|_| {
                let noise = self.noise(base, sigma);
                let mut params = base.clone();
                base.update(&noise, &mut params);
                Particle { params, noise }
            })
            .collect()
    }
}
