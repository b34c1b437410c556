use serde::{Deserialize, Serialize};

use crate::ai::QAgent;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Evaluation win rate against random opponents.
    pub win_rate: f32,
    pub abandon_rate: f32,
    pub average_game_length: f32,
    pub average_captures: f32,
    pub table_entries: usize,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
    pub capture_range: usize,
    pub threat_bucket_width: usize,
}

impl CheckpointHyperparameters {
    pub fn of(agent: &QAgent) -> Self {
        let config = agent.config();
        let encoder = agent.encoder().config();
        CheckpointHyperparameters {
            learning_rate: config.learning_rate,
            discount: config.discount,
            epsilon: config.epsilon,
            capture_range: encoder.capture_range,
            threat_bucket_width: encoder.threat_bucket_width,
        }
    }
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}
