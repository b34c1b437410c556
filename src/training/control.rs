use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use crate::game::{GameState, SEATS};

/// Periodic metrics snapshot sent from the training thread.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub episode: usize,
    pub total_episodes: usize,
    pub epsilon: f64,
    pub win_rates: [f32; SEATS],
    pub abandon_rate: f32,
    pub avg_game_length: f32,
    pub avg_captures: f32,
    pub table_entries: usize,
    pub episodes_per_sec: f32,
}

/// Final position of one match from the latest batch.
#[derive(Debug, Clone)]
pub struct LiveGameState {
    pub game_state: GameState,
    pub rolls: usize,
}

/// Updates sent from the training thread to whoever is watching.
#[derive(Debug, Clone)]
pub enum TrainingUpdate {
    Metrics(MetricsSnapshot),
    LiveGame(LiveGameState),
    EvalResult {
        episode: usize,
        win_rate: f32,
    },
    CheckpointSaved {
        episode: usize,
        path: PathBuf,
    },
    Finished {
        episodes: usize,
    },
}

/// Commands sent to the training thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingCommand {
    SaveCheckpoint,
}

/// External handles a training run listens to. All are optional; the stop
/// flag is checked between batches.
#[derive(Default)]
pub struct TrainingControl {
    pub stop: Arc<AtomicBool>,
    pub commands: Option<Receiver<TrainingCommand>>,
    pub updates: Option<Sender<TrainingUpdate>>,
}

impl TrainingControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_commands(mut self, commands: Receiver<TrainingCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_updates(mut self, updates: Sender<TrainingUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Drain pending commands without blocking.
    pub fn pending_commands(&self) -> Vec<TrainingCommand> {
        self.commands
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    /// Send an update; a closed receiver is not an error.
    pub fn send(&self, update: TrainingUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }
}
