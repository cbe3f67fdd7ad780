use std::time::Instant;

use evogym_core::env::Environment;
use evogym_core::error::RolloutError;
use evogym_core::model::Policy;
use evogym_core::solver::Solver;

/// Outcome of evaluation rollouts
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    /// Total reward of each rollout
    pub rewards: Vec<f32>,
    /// Length of each rollout
    pub times: Vec<usize>,
}

impl TestSummary {
    /// Average total reward, zero when nothing ran
    pub fn mean_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            0.0
        } else {
            self.rewards.iter().sum::<f32>() / self.rewards.len() as f32
        }
    }
}

/// Rolls the base policy out `episodes` times with the solver's selection mode
pub fn evaluate_policy<E: Environment, M: Policy>(
    solver: &mut Solver<E, M>,
    episodes: usize,
    limit: Option<usize>,
) -> Result<TestSummary, RolloutError<E::Error>> {
    println!("Testing over {} episodes", episodes);
    let now = Instant::now();
    let traces = solver.evaluate(episodes, limit)?;

    let mut summary = TestSummary {
        rewards: Vec::with_capacity(episodes),
        times: Vec::with_capacity(episodes),
    };
    for (i, t) in traces.iter().enumerate() {
        println!("Episode: {},\tReward: {},\tSteps: {}", i, t.total_reward(), t.time);
        summary.rewards.push(t.total_reward());
        summary.times.push(t.time);
    }
    println!("Test Reward: {}", summary.mean_reward());
    println!("Test runtime (secs): {}", now.elapsed().as_secs());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bin_utils::loaders::build_solver;
    use crate::bin_utils::model_params::ModelParams;
    use crate::example::Corridor;
    use evogym_core::solver::TrainConfig;

    #[test]
    fn test_evaluate_zero_policy() {
        let mut solver = build_solver(Corridor::new(4), &ModelParams::default()).unwrap();
        // Zero scores tie, so max selection always steps left and never arrives
        let summary = evaluate_policy(&mut solver, 3, Some(5)).unwrap();
        assert_eq!(summary.times, vec![5, 5, 5]);
        assert_eq!(summary.rewards, vec![-5.0, -5.0, -5.0]);
        assert_eq!(summary.mean_reward(), -5.0);

        let empty = evaluate_policy(&mut solver, 0, Some(5)).unwrap();
        assert_eq!(empty.mean_reward(), 0.0);
    }

    #[test]
    fn test_train_then_evaluate() {
        let mp = ModelParams {
            random_start: true,
            seed: 5,
            ..ModelParams::default()
        };
        let mut solver = build_solver(Corridor::new(4), &mp).unwrap();
        let cfg = TrainConfig {
            episodes: 5,
            batch_size: 1,
            population: 6,
            limit: Some(10),
            ..TrainConfig::default()
        };
        solver.train(&cfg, None).unwrap();
        assert_eq!(solver.history().len(), 5);

        let summary = evaluate_policy(&mut solver, 2, Some(10)).unwrap();
        assert_eq!(summary.rewards.len(), 2);
        assert!(summary.times.iter().all(|&t| t >= 3 && t <= 10));
    }
}
