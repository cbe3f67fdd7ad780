use std::fmt::Display;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches, SubCommand};

use evogym_core::solver::TrainConfig;
use evogym_core::update::UpdateRule;
use evogym_models::nn::NonLinearity;

use super::model_params::ModelParams;

/// Trait to add new arguments to the current app
pub trait ArgAugmenter {
    /// Type of struct to output from this parser
    type Output;

    /// Specifies arguments to add
    fn add_args<'a, 'b>(&self, app: App<'a, 'b>) -> App<'a, 'b>;

    /// Parses the arguments
    fn load_from_args<'a>(&self, args: &ArgMatches<'a>) -> Self::Output;
}

// Validators run by clap, so the parsers below only see well formed values
fn parses<T>(v: String) -> Result<(), String>
where
    T: FromStr,
    T::Err: Display,
{
    v.parse::<T>().map(|_| ()).map_err(|e| format!("{}", e))
}

fn at_least<T>(min: T) -> impl Fn(String) -> Result<(), String>
where
    T: FromStr + PartialOrd + Display + 'static,
    T::Err: Display,
{
    move |v: String| match v.parse::<T>() {
        Ok(x) if x >= min => Ok(()),
        Ok(_) => Err(format!("must be at least {}", min)),
        Err(e) => Err(format!("{}", e)),
    }
}

/// Struct defining the training arguments using ArgAugmenter
pub struct TrainArgs;

impl ArgAugmenter for TrainArgs {
    type Output = TrainConfig;

    /// Specifies arguments to add for training
    fn add_args<'a, 'b>(&self, app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("episodes")
                .short("i")
                .long("episodes")
                .takes_value(true)
                .validator(parses::<usize>)
                .help("Number of training episodes.  Defaults to 100"),
        )
        .arg(
            Arg::with_name("lr")
                .long("lr")
                .takes_value(true)
                .validator(parses::<f32>)
                .help("Learning rate.  Defaults to 0.1"),
        )
        .arg(
            Arg::with_name("sigma")
                .long("sigma")
                .takes_value(true)
                .validator(at_least(0f32))
                .help("Standard deviation of the particle noise.  Defaults to 0.1"),
        )
        .arg(
            Arg::with_name("batch")
                .short("b")
                .long("batch")
                .takes_value(true)
                .validator(at_least(1usize))
                .help("Rollouts per particle per episode"),
        )
        .arg(
            Arg::with_name("population")
                .short("l")
                .long("population")
                .takes_value(true)
                .validator(at_least(1usize))
                .help("Number of particles per episode"),
        )
        .arg(
            Arg::with_name("decay")
                .long("decay")
                .takes_value(true)
                .validator(parses::<f32>)
                .help("Multiplier applied to lr and sigma every decay step"),
        )
        .arg(
            Arg::with_name("decay_step")
                .long("decay-step")
                .takes_value(true)
                .validator(at_least(1usize))
                .help("Number of episodes between decays"),
        )
        .arg(
            Arg::with_name("update")
                .short("u")
                .long("update")
                .takes_value(true)
                .validator(parses::<UpdateRule>)
                .help("How fitness becomes an update: weighted, shaped, raw, elite or elite:<k>"),
        )
        .arg(
            Arg::with_name("elite")
                .long("elite")
                .takes_value(true)
                .requires("update")
                .validator(at_least(1usize))
                .help("Number of parents kept by the elite update"),
        )
        .arg(
            Arg::with_name("limit")
                .long("limit")
                .takes_value(true)
                .validator(parses::<usize>)
                .help("Maximum number of steps per rollout"),
        )
        .arg(
            Arg::with_name("momentum")
                .long("momentum")
                .takes_value(true)
                .validator(parses::<f32>)
                .help("Gamma parameter for momentum"),
        )
        .arg(
            Arg::with_name("report_iters")
                .short("r")
                .long("report")
                .takes_value(true)
                .validator(at_least(1usize))
                .help("How often to report progress"),
        )
    }

    /// Parses the arguments for training
    fn load_from_args<'a>(&self, args: &ArgMatches<'a>) -> Self::Output {
        let d = TrainConfig::default();

        let mut update = value_t!(args, "update", UpdateRule).unwrap_or(d.update);
        if let (UpdateRule::Elite(_), Ok(k)) = (update, value_t!(args, "elite", usize)) {
            update = UpdateRule::Elite(k);
        }

        TrainConfig {
            episodes: value_t!(args, "episodes", usize).unwrap_or(d.episodes),
            lr: value_t!(args, "lr", f32).unwrap_or(d.lr),
            sigma: value_t!(args, "sigma", f32).unwrap_or(d.sigma),
            batch_size: value_t!(args, "batch", usize).unwrap_or(d.batch_size),
            population: value_t!(args, "population", usize).unwrap_or(d.population),
            decay: value_t!(args, "decay", f32).unwrap_or(d.decay),
            decay_step: value_t!(args, "decay_step", usize).unwrap_or(d.decay_step),
            update,
            limit: value_t!(args, "limit", usize).ok(),
            momentum: value_t!(args, "momentum", f32).ok(),
            report_iter: value_t!(args, "report_iters", usize).ok(),
        }
    }
}

/// Which example environment to train against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gym {
    /// Cart-pole balancing
    CartPole,
    /// One dimensional corridor with the given number of cells
    Corridor {
        /// Number of cells
        length: usize,
    },
}

/// Specifies the environment to build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvMeta {
    /// The environment
    pub gym: Gym,
    /// Episode length cap
    pub max_steps: usize,
}

/// Struct defining the environment arguments using ArgAugmenter
pub struct EnvArgs;

impl ArgAugmenter for EnvArgs {
    type Output = EnvMeta;

    /// Specifies the environment subcommands
    fn add_args<'a, 'b>(&self, app: App<'a, 'b>) -> App<'a, 'b> {
        let max_steps = Arg::with_name("max_steps")
            .long("max-steps")
            .takes_value(true)
            .validator(at_least(1usize))
            .help("Caps the number of steps in an episode.  Defaults to 500");

        app.subcommand(
            SubCommand::with_name("cartpole")
                .about("Balance a pole on a moving cart")
                .arg(max_steps.clone()),
        )
        .subcommand(
            SubCommand::with_name("corridor")
                .about("Walk to the end of a corridor")
                .arg(max_steps)
                .arg(
                    Arg::with_name("length")
                        .long("length")
                        .takes_value(true)
                        .validator(at_least(2usize))
                        .help("Number of cells.  Defaults to 10"),
                ),
        )
    }

    /// Parses the environment subcommand, falling back to cart-pole
    fn load_from_args<'a>(&self, args: &ArgMatches<'a>) -> Self::Output {
        fn max_steps(sub: &ArgMatches) -> usize {
            value_t!(sub, "max_steps", usize).unwrap_or(500)
        }

        if let Some(sub) = args.subcommand_matches("corridor") {
            EnvMeta {
                gym: Gym::Corridor {
                    length: value_t!(sub, "length", usize).unwrap_or(10),
                },
                max_steps: max_steps(sub),
            }
        } else if let Some(sub) = args.subcommand_matches("cartpole") {
            EnvMeta {
                gym: Gym::CartPole,
                max_steps: max_steps(sub),
            }
        } else {
            EnvMeta {
                gym: Gym::CartPole,
                max_steps: 500,
            }
        }
    }
}

/// Struct defining the policy arguments using ArgAugmenter
pub struct PolicyArgs;

impl ArgAugmenter for PolicyArgs {
    type Output = ModelParams;

    /// Specifies arguments to add for the policy
    fn add_args<'a, 'b>(&self, app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("selection")
                .long("selection")
                .takes_value(true)
                .possible_values(&["max", "random"])
                .help("Pick the best scoring action or sample from the policy's distribution"),
        )
        .arg(
            Arg::with_name("hidden_nodes")
                .long("hidden")
                .multiple(true)
                .takes_value(true)
                .require_delimiter(true)
                .validator(at_least(1usize))
                .help("Comma separated hidden layer widths.  Omit for a linear policy"),
        )
        .arg(
            Arg::with_name("activation")
                .long("activation")
                .takes_value(true)
                .requires("hidden_nodes")
                .possible_values(&["relu", "sigmoid", "tanh", "elu", "linear"])
                .help("Activation function to use for hidden nodes"),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .takes_value(true)
                .validator(parses::<u64>)
                .help("Random seed for reproducibility"),
        )
        .arg(
            Arg::with_name("mask")
                .short("p")
                .long("mask")
                .takes_value(true)
                .validator(parses::<f32>)
                .help("Masking probability.  Each weight of a particle is perturbed with this probability"),
        )
        .arg(
            Arg::with_name("random_start")
                .long("random-start")
                .help("If added, the initial weights are randomly initialized"),
        )
        .arg(
            Arg::with_name("save_model")
                .long("save-model")
                .takes_value(true)
                .help("Saves final policy to a path"),
        )
        .arg(
            Arg::with_name("load_model")
                .long("load-model")
                .takes_value(true)
                .help("Load policy from path"),
        )
    }

    /// Parses the arguments for the policy
    fn load_from_args<'a>(&self, args: &ArgMatches<'a>) -> Self::Output {
        let d = ModelParams::default();

        let hidden_nodes = args
            .values_of("hidden_nodes")
            .and_then(|vals| vals.map(|v| v.parse().ok()).collect())
            .unwrap_or(d.hidden_nodes);

        let act = args
            .value_of("activation")
            .and_then(|val| match val {
                "relu" => Some(NonLinearity::ReLu),
                "tanh" => Some(NonLinearity::Tanh),
                "sigmoid" => Some(NonLinearity::Sigmoid),
                "elu" => Some(NonLinearity::ELU),
                "linear" => Some(NonLinearity::Linear),
                _ => None,
            })
            .unwrap_or(d.act);

        ModelParams {
            hidden_nodes,
            act,
            selection: args.value_of("selection").map(String::from).unwrap_or(d.selection),
            seed: value_t!(args, "seed", u64).unwrap_or(d.seed),
            random_start: args.is_present("random_start"),
            mask: value_t!(args, "mask", f32).ok(),
            load_model_path: args.value_of("load_model").map(String::from),
            save_model_path: args.value_of("save_model").map(String::from),
        }
    }
}

/// What to do around training
#[derive(Debug, Clone, PartialEq)]
pub struct RunMeta {
    /// Where the training history is written after each episode
    pub info_file: Option<String>,
    /// Number of evaluation rollouts after training
    pub test_episodes: usize,
}

/// Struct defining the reporting arguments using ArgAugmenter
pub struct RunArgs;

impl ArgAugmenter for RunArgs {
    type Output = RunMeta;

    fn add_args<'a, 'b>(&self, app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("info_file")
                .long("info-file")
                .takes_value(true)
                .help("Writes the per-episode training history as json"),
        )
        .arg(
            Arg::with_name("test")
                .short("t")
                .long("test")
                .takes_value(true)
                .validator(parses::<usize>)
                .help("After training, rolls the policy out this many times"),
        )
    }

    fn load_from_args<'a>(&self, args: &ArgMatches<'a>) -> Self::Output {
        RunMeta {
            info_file: args.value_of("info_file").map(String::from),
            test_episodes: value_t!(args, "test", usize).unwrap_or(0),
        }
    }
}
