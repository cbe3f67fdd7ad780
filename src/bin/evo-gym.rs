#[macro_use]
extern crate clap;

use std::error::Error;
use std::process;
use std::time::Instant;

use clap::{App, ArgMatches};

use evogym_core::env::Environment;
use evogym_core::history::{HistorySink, JsonHistoryFile};
use evogym_core::solver::TrainConfig;

use evogym::bin_utils::args::{
    ArgAugmenter, EnvArgs, EnvMeta, Gym, PolicyArgs, RunArgs, RunMeta, TrainArgs,
};
use evogym::bin_utils::loaders::{build_solver, write_model};
use evogym::bin_utils::model_params::ModelParams;
use evogym::bin_utils::tester::evaluate_policy;
use evogym::example::{CartPole, Corridor};

fn run<E>(env: E, mp: ModelParams, cfg: TrainConfig, rm: RunMeta) -> Result<(), Box<dyn Error>>
where
    E: Environment,
    E::Error: Error + 'static,
{
    let mut solver = build_solver(env, &mp)?;
    println!(
        "State space: {},\tAction space: {},\tSelection: {}",
        solver.config().state_space,
        solver.config().action_space,
        solver.config().selection
    );

    let mut info = rm.info_file.as_ref().map(JsonHistoryFile::new);
    let now = Instant::now();
    solver.train(&cfg, info.as_mut().map(|f| f as &mut dyn HistorySink))?;
    println!("Train runtime (secs): {}", now.elapsed().as_secs());

    if let Some((time, reward)) = solver.history().last() {
        println!("Final Reward: {},\tSteps: {}", reward, time);
    }

    if rm.test_episodes > 0 {
        evaluate_policy(&mut solver, rm.test_episodes, cfg.limit)?;
    }

    // Write out if asked
    write_model(&solver, mp.save_model_path.as_ref().map(|s| s.as_str()))?;
    Ok(())
}

fn parse<'a>() -> ArgMatches<'a> {
    let base = App::new("evo-gym")
        .version(crate_version!())
        .about("Trains policies on gym environments with evolutionary strategies");

    let base = TrainArgs.add_args(base);
    let base = PolicyArgs.add_args(base);
    let base = RunArgs.add_args(base);
    EnvArgs.add_args(base).get_matches()
}

fn main() {
    let args = parse();

    let cfg = TrainArgs.load_from_args(&args);
    let mp = PolicyArgs.load_from_args(&args);
    let rm = RunArgs.load_from_args(&args);
    let EnvMeta { gym, max_steps } = EnvArgs.load_from_args(&args);

    let result = match gym {
        Gym::CartPole => run(CartPole::new(max_steps, mp.seed), mp, cfg, rm),
        Gym::Corridor { length } => {
            // Corridors don't end on their own, so the step cap bounds the rollouts
            let cfg = TrainConfig {
                limit: Some(cfg.limit.unwrap_or(max_steps)),
                ..cfg
            };
            run(Corridor::new(length), mp, cfg, rm)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
