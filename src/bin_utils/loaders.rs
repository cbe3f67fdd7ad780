use std::error::Error;

use evogym_core::env::Environment;
use evogym_core::error::PersistError;
use evogym_core::model::{Initializer, Policy};
use evogym_core::selection::Selection;
use evogym_core::solver::Solver;
use evogym_models::nn::{Head, NNModel, Network};

use super::model_params::ModelParams;

/// Builds the initial network.  Random selection samples from the policy's output, so
/// it gets a softmax head; max selection works on raw scores.
pub fn build_policy(
    mp: &ModelParams,
    selection: Selection,
    input_dims: usize,
    output_dims: usize,
) -> Network {
    let head = match selection {
        Selection::Random => Head::Softmax,
        Selection::Max => Head::Identity,
    };
    let builder = NNModel::new(input_dims, &mp.hidden_nodes, output_dims, mp.act, head);
    if mp.random_start {
        builder.random(mp.seed.wrapping_add(2))
    } else {
        builder.zero()
    }
}

/// Builds the solver.  If a previous policy was provided, we load it for incremental
/// training.
pub fn build_solver<E: Environment>(
    env: E,
    mp: &ModelParams,
) -> Result<Solver<E, Network>, Box<dyn Error>> {
    let selection: Selection = mp.selection.parse()?;
    let policy = build_policy(mp, selection, env.state_dims(), env.action_count());
    let mut solver = Solver::new(env, policy, &mp.selection, mp.seed)?;
    if let Some(p) = mp.mask {
        solver = solver.with_mask(p)?;
    }

    if let Some(path) = &mp.load_model_path {
        println!("Loading policy from {}", path);
        solver.load_path(path)?;
    }
    Ok(solver)
}

/// Write out the policy to disk
pub fn write_model<E: Environment, M: Policy>(
    solver: &Solver<E, M>,
    smp: Option<&str>,
) -> Result<(), PersistError> {
    match smp {
        Some(fname) => {
            println!("Writing policy to {}", fname);
            solver.save_path(fname)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::{CartPole, Corridor};
    use evogym_core::error::ConfigError;
    use evogym_core::model::{Evaluator, WeightUpdater};
    use evogym_core::solver::Source;
    use evogym_models::nn::NonLinearity;

    #[test]
    fn test_build_policy() {
        let mp = ModelParams {
            hidden_nodes: vec![5],
            ..ModelParams::default()
        };
        let zero = build_policy(&mp, Selection::Max, 4, 2);
        assert_eq!(zero.sizes(), vec![5, 2]);
        assert_eq!(zero.head(), Head::Identity);
        assert_eq!(zero.num_weights(), 5 * (4 + 1) + 2 * (5 + 1));
        assert_eq!(zero.evaluate(&[1.0, 2.0, 3.0, 4.0]), vec![0.0, 0.0]);

        let mp = ModelParams {
            random_start: true,
            ..mp
        };
        let random = build_policy(&mp, Selection::Random, 4, 2);
        assert_eq!(random.head(), Head::Softmax);
        assert_eq!(random, build_policy(&mp, Selection::Random, 4, 2));
        let probs = random.evaluate(&[0.1, 0.2, 0.3, 0.4]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_build_solver() {
        let solver = build_solver(Corridor::new(6), &ModelParams::default()).unwrap();
        assert_eq!(solver.config().state_space, 6);
        assert_eq!(solver.config().action_space, 2);
        assert_eq!(solver.policy().sizes(), vec![2]);

        let mp = ModelParams {
            selection: "softmax".into(),
            ..ModelParams::default()
        };
        assert!(build_solver(Corridor::new(6), &mp).is_err());

        let masked = ModelParams {
            mask: Some(0.5),
            ..ModelParams::default()
        };
        assert!(build_solver(Corridor::new(6), &masked).is_ok());
        for &p in [0.0, 1.5].iter() {
            let mp = ModelParams {
                mask: Some(p),
                ..ModelParams::default()
            };
            assert!(build_solver(Corridor::new(6), &mp).is_err());
        }
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let fname = path.to_str().unwrap();

        let mp = ModelParams {
            hidden_nodes: vec![8],
            act: NonLinearity::Tanh,
            random_start: true,
            seed: 11,
            ..ModelParams::default()
        };
        let trained = build_solver(CartPole::new(100, 1), &mp).unwrap();
        write_model(&trained, Some(fname)).unwrap();
        write_model(&trained, None).unwrap();

        // A fresh zero policy picks up the saved weights
        let mp = ModelParams {
            load_model_path: Some(fname.into()),
            ..ModelParams::default()
        };
        let loaded = build_solver(CartPole::new(100, 1), &mp).unwrap();
        assert_eq!(loaded.policy(), trained.policy());
        let obs = [0.01, -0.02, 0.03, 0.0];
        assert_eq!(
            loaded.policy().evaluate(&obs),
            trained.policy().evaluate(&obs)
        );

        // Cart-pole policies don't fit a corridor
        assert!(build_solver(Corridor::new(5), &mp).is_err());
    }

    #[test]
    fn test_load_rejects_malformed_networks() {
        let mut solver = build_solver(Corridor::new(4), &ModelParams::default()).unwrap();
        let before = solver.policy().clone();

        let docs = [
            r#"{"selection": "max", "state_space": 4, "action_space": 2,
                "model": {"layers": [], "head": "Identity"}}"#,
            r#"{"selection": "max", "state_space": 4, "action_space": 2,
                "model": {"layers": [{"w": [], "bias": [], "nl": "Linear"}],
                          "head": "Identity"}}"#,
            r#"{"selection": "random", "state_space": 4, "action_space": 2,
                "model": {"layers": [
                    {"w": [[1, 0, 0, 0], [0, 1, 0, 0]], "bias": [0, 0], "nl": "ReLu"},
                    {"w": [[1, 0, 0], [0, 1, 0]], "bias": [0, 0], "nl": "Linear"}],
                          "head": "Softmax"}}"#,
        ];
        for doc in docs.iter() {
            match solver.load(&mut doc.as_bytes()) {
                Err(PersistError::Shape(ConfigError::Malformed(_))) => (),
                other => panic!("unexpected: {:?}", other),
            }
        }

        // Nothing changed and the policy still runs
        assert_eq!(solver.policy(), &before);
        assert_eq!(solver.config().selection, Selection::Max);
        assert_eq!(solver.pathfind(Source::Base, Some(3)).unwrap().time, 3);
    }
}
