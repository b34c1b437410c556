use std::path::PathBuf;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::ai::QAgent;
use crate::checkpoint::{CheckpointManager, CheckpointMetrics};
use crate::error::TrainingError;
use crate::game::{Rules, Seat};
use crate::training::control::{
    LiveGameState, MetricsSnapshot, TrainingCommand, TrainingControl, TrainingUpdate,
};
use crate::training::driver::{MatchOutcome, DEFAULT_MAX_ROLLS};
use crate::training::episode::{episode_seed, evaluate, play_self_play_match};
use crate::training::metrics::{EpisodeResult, TimingMetrics, TrainingMetrics};

/// Salt separating evaluation seeds from self-play seeds.
const EVAL_SEED_SALT: u64 = 0x6576_616c;

/// Trainer configuration, loadable from the `[training]` config section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    /// Matches played concurrently per batch.
    pub parallel_matches: usize,
    /// Roll cap per match.
    pub max_rolls: usize,
    pub log_interval: usize,
    /// 0 disables periodic evaluation.
    pub eval_interval: usize,
    pub eval_games: usize,
    /// 0 disables periodic checkpoints.
    pub checkpoint_interval: usize,
    pub seed: u64,
    /// Pause between batches, for watching a run.
    pub throttle_ms: u64,
    /// Where `train` writes the final table.
    pub model_path: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 10_000,
            parallel_matches: 8,
            max_rolls: DEFAULT_MAX_ROLLS,
            log_interval: 1_000,
            eval_interval: 5_000,
            eval_games: 200,
            checkpoint_interval: 10_000,
            seed: 0,
            throttle_ms: 0,
            model_path: PathBuf::from("q_table.json"),
        }
    }
}

/// What a finished (or stopped) run achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Episodes played by this run.
    pub episodes_played: usize,
    /// Cumulative episode count, including any resumed ones.
    pub final_episode: usize,
    pub table_entries: usize,
    pub final_win_rate: Option<f32>,
    pub stopped: bool,
}

/// Self-play trainer for the shared Q-learning agent.
///
/// Matches run in batches of `parallel_matches` on the rayon pool, all
/// writing to the agent's one table. Stop requests, commands, evaluation,
/// and checkpoints are handled between batches.
pub struct Trainer {
    config: TrainerConfig,
    rules: Rules,
    checkpoint_manager: Option<CheckpointManager>,
}

impl Trainer {
    pub fn new(config: TrainerConfig, rules: Rules) -> Self {
        Trainer {
            config,
            rules,
            checkpoint_manager: None,
        }
    }

    pub fn with_checkpoints(mut self, manager: CheckpointManager) -> Self {
        self.checkpoint_manager = Some(manager);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Run `num_episodes` self-play matches after `start_episode` already
    /// completed ones.
    pub fn train(
        &self,
        agent: &QAgent,
        start_episode: usize,
        control: &TrainingControl,
    ) -> Result<TrainingSummary, TrainingError> {
        let mut metrics = TrainingMetrics::new();
        let mut timing = TimingMetrics::new();
        let batch = self.config.parallel_matches.max(1);
        let end_episode = start_episode + self.config.num_episodes;
        let mut episode = start_episode;
        let mut last_eval = None;
        let mut stopped = false;

        log::info!(
            "{:<32}{:<32}",
            "beginning self-play",
            format!("episodes {}..{} ({} parallel)", start_episode + 1, end_episode, batch)
        );

        while episode < end_episode {
            if control.stop_requested() {
                log::info!("{:<32}{:<32}", "stop requested", format!("episode {episode}"));
                stopped = true;
                break;
            }
            for command in control.pending_commands() {
                match command {
                    TrainingCommand::SaveCheckpoint => {
                        let overhead = Instant::now();
                        self.checkpoint(agent, &metrics, episode, control)?;
                        timing.record_overhead(overhead.elapsed());
                    }
                }
            }

            let batch_end = (episode + batch).min(end_episode);
            let started = Instant::now();
            let outcomes = (episode..batch_end)
                .into_par_iter()
                .map(|ep| {
                    play_self_play_match(&self.rules, agent, self.config.max_rolls, episode_seed(self.config.seed, ep))
                })
                .collect::<Result<Vec<MatchOutcome>, TrainingError>>()?;
            timing.record_batch(outcomes.len(), started.elapsed());

            for outcome in &outcomes {
                metrics.record_episode(EpisodeResult::from(outcome));
                metrics.record_updates(outcome.stats.updates);
            }
            if let Some(last) = outcomes.last() {
                control.send(TrainingUpdate::LiveGame(LiveGameState {
                    game_state: last.final_state.clone(),
                    rolls: last.stats.rolls,
                }));
            }

            let previous = episode;
            episode = batch_end;

            if crossed(previous, episode, self.config.log_interval) {
                let snapshot = self.snapshot(agent, &metrics, &timing, episode, end_episode);
                log_snapshot(&snapshot);
                control.send(TrainingUpdate::Metrics(snapshot));
                timing.reset_window();
            }

            if crossed(previous, episode, self.config.eval_interval) && self.config.eval_games > 0 {
                let overhead = Instant::now();
                let win_rate = self.evaluate(agent, episode)?;
                timing.record_overhead(overhead.elapsed());
                log::info!(
                    "{:<32}{:<32}",
                    "eval vs random",
                    format!("{:.1}% over {} games", win_rate * 100.0, self.config.eval_games)
                );
                last_eval = Some(win_rate);
                control.send(TrainingUpdate::EvalResult { episode, win_rate });
            }

            if crossed(previous, episode, self.config.checkpoint_interval) {
                let overhead = Instant::now();
                self.checkpoint(agent, &metrics, episode, control)?;
                timing.record_overhead(overhead.elapsed());
            }

            if self.config.throttle_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.config.throttle_ms));
            }
        }

        if !stopped && self.config.eval_games > 0 {
            let win_rate = self.evaluate(agent, episode)?;
            log::info!("{:<32}{:<32}", "final eval vs random", format!("{:.1}%", win_rate * 100.0));
            last_eval = Some(win_rate);
        }

        let summary = TrainingSummary {
            episodes_played: episode - start_episode,
            final_episode: episode,
            table_entries: agent.table().len(),
            final_win_rate: last_eval,
            stopped,
        };
        log::info!(
            "{:<32}{:<32}",
            "training complete",
            format!("{} episodes, {} q-values", summary.episodes_played, summary.table_entries)
        );
        control.send(TrainingUpdate::Finished { episodes: episode });
        Ok(summary)
    }

    /// Greedy win rate against three random seats.
    pub fn evaluate(&self, agent: &QAgent, episode: usize) -> Result<f32, TrainingError> {
        evaluate(
            &self.rules,
            agent,
            self.config.eval_games,
            self.config.max_rolls,
            episode_seed(self.config.seed ^ EVAL_SEED_SALT, episode),
        )
    }

    fn checkpoint(
        &self,
        agent: &QAgent,
        metrics: &TrainingMetrics,
        episode: usize,
        control: &TrainingControl,
    ) -> Result<(), TrainingError> {
        let Some(manager) = &self.checkpoint_manager else {
            log::warn!("checkpoint requested but no checkpoint directory is configured");
            return Ok(());
        };
        let window = self.config.log_interval.max(1);
        let win_rate = if self.config.eval_games > 0 {
            self.evaluate(agent, episode)?
        } else {
            0.0
        };
        let ckpt_metrics = CheckpointMetrics {
            win_rate,
            abandon_rate: metrics.abandon_rate(window),
            average_game_length: metrics.average_game_length(window),
            average_captures: metrics.average_captures(window),
            table_entries: agent.table().len(),
        };
        let path = manager.save_checkpoint(agent, &ckpt_metrics, episode)?;
        control.send(TrainingUpdate::CheckpointSaved { episode, path });
        Ok(())
    }

    fn snapshot(
        &self,
        agent: &QAgent,
        metrics: &TrainingMetrics,
        timing: &TimingMetrics,
        episode: usize,
        total_episodes: usize,
    ) -> MetricsSnapshot {
        let window = self.config.log_interval.max(1);
        MetricsSnapshot {
            episode,
            total_episodes,
            epsilon: agent.config().epsilon,
            win_rates: metrics.win_rates(window),
            abandon_rate: metrics.abandon_rate(window),
            avg_game_length: metrics.average_game_length(window),
            avg_captures: metrics.average_captures(window),
            table_entries: agent.table().len(),
            episodes_per_sec: timing.episodes_per_sec(),
        }
    }
}

/// Whether a multiple of `interval` lies in `(previous, current]`.
fn crossed(previous: usize, current: usize, interval: usize) -> bool {
    interval > 0 && previous / interval != current / interval
}

fn log_snapshot(s: &MetricsSnapshot) {
    let wins = Seat::ALL
        .iter()
        .zip(s.win_rates)
        .map(|(seat, rate)| format!("{} {:.0}%", seat.name(), rate * 100.0))
        .collect::<Vec<_>>()
        .join(" ");
    log::info!(
        "{:<32}{:<32}",
        format!("episode {}/{}", s.episode, s.total_episodes),
        format!(
            "{wins} | abandoned {:.1}% | rolls {:.0} | captures {:.1} | q-values {} | {:.0} ep/s",
            s.abandon_rate * 100.0,
            s.avg_game_length,
            s.avg_captures,
            s.table_entries,
            s.episodes_per_sec
        )
    );
}
