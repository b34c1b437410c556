use std::path::PathBuf;

use crate::game::{Action, MoveError, Seat};

/// Errors that can occur when loading or saving a Q-table model file.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write model file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt model file {path}: {source}")]
    CorruptFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("corrupt model entry {entry:?} in {path}: {reason}")]
    CorruptEntry {
        path: PathBuf,
        entry: String,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the Q-learning agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("no legal actions to choose from")]
    NoLegalActions,

    #[error("input closed before an action was chosen")]
    InputClosed,

    #[error("input error: {0}")]
    Input(String),
}

/// Errors that can occur during training or a match.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("{seat:?} selected illegal action {action} (legal: {legal:?})")]
    IllegalAction {
        seat: Seat,
        action: Action,
        legal: Vec<Action>,
    },

    #[error("rules error: {0}")]
    Move(#[from] MoveError),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid board: {0}")]
    InvalidBoard(String),

    #[error("config validation error: {0}")]
    Validation(String),
}
