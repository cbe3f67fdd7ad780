//! Evogym-Core
//! ===
//!
//! This library contains the components for training small feed-forward policies
//! against discrete-action environments using Evolutionary Strategies.  The network
//! itself is opaque to this crate: anything implementing [`model::Policy`] can be
//! trained.
//!
//! Training loop
//! ---
//!
//! Each training episode draws a population of particles, which are copies of the
//! current policy jittered with Gaussian noise.  Every particle is rolled out against
//! the environment for a mini-batch of episodes and its fitness is the summed reward.
//! The fitness values are turned into weights by an [`update::UpdateRule`] and the
//! weighted noise vectors are added back onto the policy.
//!
//! Update rules
//! ---
//! Four flavors are available, with different tradeoffs.  `weighted` z-whitens the
//! fitness scores (ala Salimans et al.), `shaped` uses rank-based fitness shaping
//! (Wierstra et al.) which helps with early local optima, `elite` blends only the top
//! K candidates as in canonical (1+λ)-ES and `raw` uses the fitness values as-is.
//!
//! Action selection
//! ---
//! The forward pass of a policy produces one score per action.  `max` takes the
//! highest scoring action while `random` samples from the scores, which then need to
//! form a probability distribution.
//!

#![warn(missing_docs, unused)]

#[macro_use]
extern crate serde_derive;

/// Defines the interfaces for Model types used by the solver
pub mod model;

/// Defines the interface for Environments
pub mod env;

/// Error types
pub mod error;

/// Maps action scores to actions
pub mod selection;

/// Runs single episodes against an environment
pub mod rollout;

/// Combines particle fitness into a parameter update
pub mod update;

/// Per-episode training statistics and their sinks
pub mod history;

/// Defines the Evolutionary Strategies solver
pub mod solver;

#[cfg(test)]
pub(crate) mod testing;
