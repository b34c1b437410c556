use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ludo_qlearning::ai::{Agent, Mode};
use ludo_qlearning::config::AppConfig;
use ludo_qlearning::error::{AgentError, TrainingError};
use ludo_qlearning::game::{Action, GameState, Seat};
use ludo_qlearning::training::{Controller, MatchDriver};
use ludo_qlearning::ui::{HumanAgent, TextView};

/// Play Ludo at the terminal against the learned agent.
#[derive(Parser)]
#[command(name = "ludo", about = "Play Ludo against a Q-learning agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Q-table to play with (defaults to training.model_path)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seat played from the terminal; repeat for several humans
    #[arg(long, default_value = "red")]
    human: Vec<String>,

    /// Let the agent play all four seats
    #[arg(long)]
    watch: bool,

    /// Seed for the dice
    #[arg(long)]
    seed: Option<u64>,
}

/// Lets one terminal reader serve several seats.
struct SharedSeat<A>(Rc<RefCell<A>>);

impl<A: Agent> Agent for SharedSeat<A> {
    fn select_action(&mut self, state: &GameState, legal: &[Action]) -> Result<Action, AgentError> {
        self.0.borrow_mut().select_action(state, legal)
    }

    fn name(&self) -> &str {
        "Human"
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let rules = config.build_rules().context("building board")?;
    let mut agent = config.build_agent();

    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.training.model_path.clone());
    if model.exists() {
        agent
            .load(&model)
            .with_context(|| format!("loading model {}", model.display()))?;
    } else if cli.model.is_some() {
        bail!("model file {} not found", model.display());
    } else {
        log::warn!("no model at {}, the agent plays untrained", model.display());
    }

    let humans = if cli.watch {
        Vec::new()
    } else {
        cli.human
            .iter()
            .map(|name| Seat::from_name(name).with_context(|| format!("unknown seat '{name}'")))
            .collect::<Result<Vec<Seat>>>()?
    };

    let human = Rc::new(RefCell::new(HumanAgent::new("Human", io::stdin().lock(), io::stdout())));
    let seats = Seat::ALL.map(|seat| {
        if humans.contains(&seat) {
            Controller::External(Box::new(SharedSeat(Rc::clone(&human))))
        } else {
            Controller::Learner
        }
    });
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    if !humans.is_empty() {
        let names: Vec<&str> = humans.iter().map(|s| s.name()).collect();
        println!("You play {}. Type a piece number and Enter to move, q to quit.", names.join(", "));
    }

    let mut view = TextView::new(rules.board().clone(), io::stdout());
    let result = MatchDriver::new(&rules, &agent, Mode::Play, seats, rng)
        .with_observer(&mut view)
        .with_max_rolls(config.training.max_rolls)
        .run();
    if let Some(err) = view.take_error() {
        return Err(err).context("writing to terminal");
    }

    match result {
        Ok(outcome) => {
            println!(
                "{} rolls, {} moves, {} captures",
                outcome.stats.rolls, outcome.stats.moves, outcome.stats.captures
            );
            Ok(())
        }
        Err(TrainingError::Agent(AgentError::InputClosed)) => {
            println!("Goodbye.");
            Ok(())
        }
        Err(err) => Err(err).context("playing match"),
    }
}
