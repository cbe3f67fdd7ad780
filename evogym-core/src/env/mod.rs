/// Result of advancing an environment by one action
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Observation after the action, flattened
    pub observation: Vec<f32>,
    /// Immediate reward
    pub reward: f32,
    /// Whether the episode is over
    pub done: bool,
}

/// A discrete-action environment with vector observations.
///
/// The solver only resets and steps it; failures from either are handed back to
/// the caller untouched.
pub trait Environment {
    /// Error raised by the simulator
    type Error;

    /// Shape of the observation.  Its product is the state dimensionality.
    fn observation_shape(&self) -> &[usize];

    /// Number of discrete actions
    fn action_count(&self) -> usize;

    /// Starts a new episode, returning the initial observation
    fn reset(&mut self) -> Result<Vec<f32>, Self::Error>;

    /// Applies an action
    fn step(&mut self, action: usize) -> Result<Transition, Self::Error>;

    /// Flattened observation size
    fn state_dims(&self) -> usize {
        self.observation_shape().iter().product()
    }
}
