//! Match driving and self-play training: the turn-cycle driver, episode
//! helpers, the batched trainer, metrics, and control messages for watching
//! or steering a run.

pub mod control;
pub mod driver;
pub mod episode;
pub mod metrics;
pub mod trainer;

pub use control::{TrainingCommand, TrainingControl, TrainingUpdate};
pub use driver::{Controller, MatchDriver, MatchObserver, MatchOutcome, MatchStats, Phase, TurnEvent};
pub use trainer::{Trainer, TrainerConfig, TrainingSummary};
