/// Gaussian noise generation for particles
pub mod sampler;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConfigError;

/// Initializes an empty model
pub trait Initializer {
    /// Type of model built
    type Model: Clone;

    /// Builds a model of the configured topology with every weight set to zero
    fn zero(&self) -> Self::Model;
}

/// Evaluates a model with a given payload to a given output
pub trait Evaluator<Payload: ?Sized, Output>: Sync {
    /// Runs the forward pass
    fn evaluate(&self, payload: &Payload) -> Output;
}

/// Updates a given model's weights
pub trait WeightUpdater {
    /// Number of parameters, biases included
    fn num_weights(&self) -> usize;

    /// Overwrites every weight with successive values from `f`
    fn update_gradients<F>(&mut self, f: &mut F)
    where
        F: FnMut() -> f32;

    /// Multiplies every weight by `f`
    fn scale_gradients(&mut self, f: f32);

    /// Copies every weight into `other`, which must have the same shape
    fn copy_gradients(&self, other: &mut Self);

    /// Adds the weights of `other`, which must have the same shape
    fn add_gradients(&mut self, other: &Self);
}

/// Updates a model with a gradient
pub trait GradientFuser<A> {
    /// Writes `self + grad` into `into`, leaving `self` untouched
    fn update(&self, grad: &A, into: &mut Self);
}

/// Everything the solver needs from a policy: a forward pass producing one score per
/// action, weight arithmetic for jitter and updates, and serialization.
pub trait Policy:
    Clone
    + WeightUpdater
    + GradientFuser<Self>
    + Evaluator<[f32], Vec<f32>>
    + Serialize
    + DeserializeOwned
{
    /// Size of the flattened observation the policy consumes
    fn input_dims(&self) -> usize;

    /// Number of action scores the policy emits
    fn output_dims(&self) -> usize;

    /// Checks that the parameters fit together.  Deserialized models must pass this
    /// before any of the other methods are called on them.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Returns a copy of `like` with all weights zeroed
pub fn zeroed<M: Clone + WeightUpdater>(like: &M) -> M {
    let mut z = like.clone();
    z.update_gradients(&mut || 0f32);
    z
}
