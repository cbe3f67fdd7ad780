//! Small policies and environments shared by the unit tests

use std::convert::Infallible;

use crate::env::{Environment, Transition};
use crate::error::ConfigError;
use crate::model::{Evaluator, GradientFuser, Policy, WeightUpdater};

/// Linear map from observation to scores, stored row-major with the bias last
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Affine {
    inputs: usize,
    outputs: usize,
    w: Vec<f32>,
}

impl Affine {
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Affine {
            inputs,
            outputs,
            w: vec![0f32; (inputs + 1) * outputs],
        }
    }

    pub fn flat(&self) -> &[f32] {
        &self.w
    }
}

impl Evaluator<[f32], Vec<f32>> for Affine {
    fn evaluate(&self, payload: &[f32]) -> Vec<f32> {
        self.w
            .chunks(self.inputs + 1)
            .map(|row| {
                let dot: f32 = row.iter().zip(payload).map(|(w, x)| w * x).sum();
                dot + row[self.inputs]
            })
            .collect()
    }
}

impl WeightUpdater for Affine {
    fn num_weights(&self) -> usize {
        self.w.len()
    }

    fn update_gradients<F>(&mut self, f: &mut F)
    where
        F: FnMut() -> f32,
    {
        for w in self.w.iter_mut() {
            *w = f();
        }
    }

    fn scale_gradients(&mut self, s: f32) {
        self.w.iter_mut().for_each(|w| *w *= s);
    }

    fn copy_gradients(&self, other: &mut Self) {
        other.w.copy_from_slice(&self.w);
    }

    fn add_gradients(&mut self, other: &Self) {
        for (w, o) in self.w.iter_mut().zip(other.w.iter()) {
            *w += o;
        }
    }
}

impl GradientFuser<Affine> for Affine {
    fn update(&self, grad: &Affine, into: &mut Self) {
        for i in 0..self.w.len() {
            into.w[i] = self.w[i] + grad.w[i];
        }
    }
}

impl Policy for Affine {
    fn input_dims(&self) -> usize {
        self.inputs
    }

    fn output_dims(&self) -> usize {
        self.outputs
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.w.len() == (self.inputs + 1) * self.outputs {
            Ok(())
        } else {
            Err(ConfigError::Malformed(format!(
                "{} weights for {} inputs and {} outputs",
                self.w.len(),
                self.inputs,
                self.outputs
            )))
        }
    }
}

/// Environment which never finishes on its own, paying 1 per step
pub struct Endless {
    pub shape: Vec<usize>,
    pub actions: usize,
}

impl Environment for Endless {
    type Error = Infallible;

    fn observation_shape(&self) -> &[usize] {
        &self.shape
    }

    fn action_count(&self) -> usize {
        self.actions
    }

    fn reset(&mut self) -> Result<Vec<f32>, Infallible> {
        Ok(vec![1f32; self.state_dims()])
    }

    fn step(&mut self, _action: usize) -> Result<Transition, Infallible> {
        Ok(Transition {
            observation: vec![1f32; self.state_dims()],
            reward: 1.0,
            done: false,
        })
    }
}

/// Episode `k` (counting resets from zero) lasts `k % 3 + 1` steps and every step
/// pays `k + 1`, so consecutive rollouts have different totals and lengths.
pub struct Staircase {
    pub episode: usize,
    pub step: usize,
}

impl Staircase {
    pub fn new() -> Self {
        Staircase {
            episode: 0,
            step: 0,
        }
    }
}

impl Environment for Staircase {
    type Error = Infallible;

    fn observation_shape(&self) -> &[usize] {
        &[2]
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<f32>, Infallible> {
        if self.step > 0 {
            self.episode += 1;
        }
        self.step = 0;
        Ok(vec![0.5, -0.5])
    }

    fn step(&mut self, _action: usize) -> Result<Transition, Infallible> {
        self.step += 1;
        Ok(Transition {
            observation: vec![0.5, -0.5],
            reward: (self.episode + 1) as f32,
            done: self.step == self.episode % 3 + 1,
        })
    }
}

/// One-step environment which pays 1 for action 1 and nothing otherwise
pub struct Bandit;

impl Environment for Bandit {
    type Error = Infallible;

    fn observation_shape(&self) -> &[usize] {
        &[1]
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<f32>, Infallible> {
        Ok(vec![1.0])
    }

    fn step(&mut self, action: usize) -> Result<Transition, Infallible> {
        Ok(Transition {
            observation: vec![1.0],
            reward: if action == 1 { 1.0 } else { 0.0 },
            done: true,
        })
    }
}

/// Fails on the given reset
pub struct Broken {
    pub fail_on: usize,
    pub resets: usize,
}

impl Environment for Broken {
    type Error = String;

    fn observation_shape(&self) -> &[usize] {
        &[1]
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<f32>, String> {
        self.resets += 1;
        if self.resets == self.fail_on {
            Err("simulator crashed".into())
        } else {
            Ok(vec![0.0])
        }
    }

    fn step(&mut self, _action: usize) -> Result<Transition, String> {
        Ok(Transition {
            observation: vec![0.0],
            reward: 1.0,
            done: true,
        })
    }
}
