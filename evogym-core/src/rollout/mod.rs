use crate::env::Environment;
use crate::error::RolloutError;
use crate::model::Policy;
use crate::selection::ActionSelector;

#[derive(Clone, Debug, Default, PartialEq)]
/// Record of a single episode
pub struct EpisodeTrace {
    /// Actions taken, in order
    pub actions: Vec<usize>,
    /// Immediate rewards, in order
    pub rewards: Vec<f32>,
    /// Number of steps taken
    pub time: usize,
}

impl EpisodeTrace {
    /// Sum of the immediate rewards
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }
}

// Observations must already be flat
fn check_observation<E>(obs: &[f32], state_dims: usize) -> Result<(), RolloutError<E>> {
    if obs.len() != state_dims {
        Err(RolloutError::Observation {
            expected: state_dims,
            found: obs.len(),
        })
    } else {
        Ok(())
    }
}

/// Scores a flattened observation with `model` and picks an action from the scores
pub fn select_action<E, M: Policy>(
    model: &M,
    selector: &mut ActionSelector,
    state: &[f32],
    state_dims: usize,
) -> Result<usize, RolloutError<E>> {
    check_observation(state, state_dims)?;
    let scores = model.evaluate(state);
    Ok(selector.select(&scores)?)
}

/// Runs one episode with `model`, stopping when the environment is done or after
/// `limit` steps.  Only the environment and the selector's random stream are
/// advanced; the model is read-only.
pub fn rollout<E, M>(
    env: &mut E,
    model: &M,
    selector: &mut ActionSelector,
    state_dims: usize,
    limit: Option<usize>,
) -> Result<EpisodeTrace, RolloutError<E::Error>>
where
    E: Environment,
    M: Policy,
{
    let mut state = env.reset().map_err(RolloutError::Environment)?;
    check_observation(&state, state_dims)?;

    let mut trace = EpisodeTrace::default();
    loop {
        if limit == Some(trace.time) {
            break;
        }
        let action = select_action(model, selector, &state, state_dims)?;
        let t = env.step(action).map_err(RolloutError::Environment)?;
        trace.actions.push(action);
        trace.rewards.push(t.reward);
        trace.time += 1;
        if t.done {
            break;
        }
        state = t.observation;
    }
    Ok(trace)
}
