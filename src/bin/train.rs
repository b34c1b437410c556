use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;

use ludo_qlearning::checkpoint::CheckpointManager;
use ludo_qlearning::config::AppConfig;
use ludo_qlearning::error::CheckpointError;
use ludo_qlearning::training::{Trainer, TrainingCommand, TrainingControl};

/// Train the Ludo Q-learning agent via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train a Ludo Q-learning agent by self-play")]
struct Cli {
    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Start from an existing Q-table instead of an empty one
    #[arg(long, conflicts_with = "resume")]
    model: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override exploration rate
    #[arg(long)]
    epsilon: Option<f64>,

    /// Override the base seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override matches per parallel batch
    #[arg(long)]
    parallel: Option<usize>,

    /// Where to write the final Q-table (defaults to training.model_path)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    // Load configuration
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.agent.learning_rate = lr;
    }
    if let Some(epsilon) = cli.epsilon {
        app_config.agent.epsilon = epsilon;
    }
    if let Some(seed) = cli.seed {
        app_config.training.seed = seed;
    }
    if let Some(parallel) = cli.parallel {
        app_config.training.parallel_matches = parallel;
    }
    app_config
        .validate()
        .context("invalid configuration after command-line overrides")?;

    let rules = app_config.build_rules().context("building board")?;
    let mut agent = app_config.build_agent();
    let manager = CheckpointManager::new(app_config.checkpoint.clone()).with_context(|| {
        format!(
            "creating checkpoint directory {}",
            app_config.checkpoint.checkpoint_dir.display()
        )
    })?;

    let mut start_episode = 0;
    if cli.resume {
        match manager.restore_latest(&mut agent) {
            Ok(metadata) => start_episode = metadata.episode,
            Err(CheckpointError::NoLatestSymlink(dir)) => {
                log::warn!("no checkpoint found in {}, starting fresh", dir.display());
            }
            Err(err) => return Err(err).context("resuming from latest checkpoint"),
        }
    } else if let Some(model) = &cli.model {
        if !model.exists() {
            bail!("model file {} not found", model.display());
        }
        agent
            .load(model)
            .with_context(|| format!("loading model {}", model.display()))?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (cmd_tx, cmd_rx) = mpsc::channel::<TrainingCommand>();
    spawn_stdin_listener(Arc::clone(&stop), cmd_tx);
    let control = TrainingControl::new()
        .with_stop(stop)
        .with_commands(cmd_rx);

    log::info!("type 'q' + Enter to stop, 's' + Enter to save a checkpoint");
    let trainer = Trainer::new(app_config.training.clone(), rules).with_checkpoints(manager);
    let summary = trainer
        .train(&agent, start_episode, &control)
        .context("training")?;

    let output = cli
        .output
        .unwrap_or_else(|| app_config.training.model_path.clone());
    agent
        .save(&output)
        .with_context(|| format!("saving model to {}", output.display()))?;

    if let Some(win_rate) = summary.final_win_rate {
        println!(
            "Trained to episode {} | {} q-values | eval vs random {:.1}%",
            summary.final_episode,
            summary.table_entries,
            win_rate * 100.0
        );
    } else {
        println!(
            "Trained to episode {} | {} q-values",
            summary.final_episode, summary.table_entries
        );
    }
    Ok(())
}

/// Read control keys from stdin on a background thread. The thread is left
/// running; it ends with the process.
fn spawn_stdin_listener(stop: Arc<AtomicBool>, commands: mpsc::Sender<TrainingCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "q" | "Q" => {
                    stop.store(true, Ordering::Relaxed);
                    break;
                }
                "s" | "S" => {
                    if commands.send(TrainingCommand::SaveCheckpoint).is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
    });
}
