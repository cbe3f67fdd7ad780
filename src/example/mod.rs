//! Example Environments
use std::f32::consts::PI;
use std::fmt;

use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use evogym_core::env::{Environment, Transition};

#[derive(Debug, Clone, PartialEq)]
/// Misuse of an example environment
pub enum EnvError {
    /// Action index outside the action space
    InvalidAction(usize),
    /// `step` called before `reset` or after the episode ended
    NotReset,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnvError::InvalidAction(a) => write!(f, "invalid action {}", a),
            EnvError::NotReset => write!(f, "step called on a finished episode, call reset"),
        }
    }
}

impl std::error::Error for EnvError {}

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
// Half the pole's length
const LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * LENGTH;
const FORCE_MAG: f32 = 10.0;
// Seconds between state updates
const TAU: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;

/// Classic cart-pole balancing.  Observations are cart position, cart velocity, pole
/// angle and pole angular velocity; action 0 pushes left and 1 pushes right.  Every
/// step pays 1 until the pole tips past 12 degrees, the cart leaves the track or
/// `max_steps` is reached.
pub struct CartPole {
    state: [f32; 4],
    steps: usize,
    max_steps: usize,
    done: bool,
    init: Uniform<f32>,
    rng: XorShiftRng,
}

impl CartPole {
    /// Creates a new cart-pole; the seed drives the initial states
    pub fn new(max_steps: usize, seed: u64) -> Self {
        CartPole {
            state: [0f32; 4],
            steps: 0,
            max_steps,
            done: true,
            init: Uniform::new_inclusive(-0.05, 0.05),
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    fn theta_threshold() -> f32 {
        12. * 2. * PI / 360.
    }
}

impl Environment for CartPole {
    type Error = EnvError;

    fn observation_shape(&self) -> &[usize] {
        &[4]
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        for s in self.state.iter_mut() {
            *s = self.init.sample(&mut self.rng);
        }
        self.steps = 0;
        self.done = false;
        Ok(self.state.to_vec())
    }

    fn step(&mut self, action: usize) -> Result<Transition, EnvError> {
        if action > 1 {
            return Err(EnvError::InvalidAction(action));
        }
        if self.done {
            return Err(EnvError::NotReset);
        }

        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let (sintheta, costheta) = theta.sin_cos();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sintheta) / TOTAL_MASS;
        let thetaacc = (GRAVITY * sintheta - costheta * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * costheta * costheta / TOTAL_MASS));
        let xacc = temp - POLE_MASS_LENGTH * thetaacc * costheta / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * xacc,
            theta + TAU * theta_dot,
            theta_dot + TAU * thetaacc,
        ];
        self.steps += 1;

        let [x, _, theta, _] = self.state;
        self.done = x.abs() > X_THRESHOLD
            || theta.abs() > CartPole::theta_threshold()
            || self.steps >= self.max_steps;

        Ok(Transition {
            observation: self.state.to_vec(),
            reward: 1.0,
            done: self.done,
        })
    }
}

/// A corridor of `length` cells.  The agent starts in the leftmost cell and moves left
/// (action 0) or right (action 1), paying 1 per step and earning `length` on reaching
/// the rightmost cell.  Observations are a one-hot `[1, length]` grid.
pub struct Corridor {
    shape: [usize; 2],
    position: usize,
    done: bool,
}

impl Corridor {
    /// Creates a corridor; `length` must be at least 2
    pub fn new(length: usize) -> Self {
        assert!(length >= 2);
        Corridor {
            shape: [1, length],
            position: 0,
            done: true,
        }
    }

    fn observe(&self) -> Vec<f32> {
        let mut obs = vec![0f32; self.shape[1]];
        obs[self.position] = 1.0;
        obs
    }
}

impl Environment for Corridor {
    type Error = EnvError;

    fn observation_shape(&self) -> &[usize] {
        &self.shape
    }

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.position = 0;
        self.done = false;
        Ok(self.observe())
    }

    fn step(&mut self, action: usize) -> Result<Transition, EnvError> {
        if self.done {
            return Err(EnvError::NotReset);
        }
        let goal = self.shape[1] - 1;
        match action {
            0 => self.position = self.position.saturating_sub(1),
            1 => self.position += 1,
            a => return Err(EnvError::InvalidAction(a)),
        }
        self.done = self.position == goal;
        let reward = if self.done { self.shape[1] as f32 } else { -1.0 };
        Ok(Transition {
            observation: self.observe(),
            reward,
            done: self.done,
        })
    }
}
