//! # Ludo Q-Learning
//!
//! A four-player Ludo rules engine with a tabular Q-learning agent trained
//! by self-play.
//!
//! ## Modules
//!
//! - [`game`]: Board topology, seats, game state, rules engine
//! - [`ai`]: Agent trait, state encoding, Q-table, Q-learning and random agents
//! - [`training`]: Match driver, batched self-play trainer, metrics, control messages
//! - [`checkpoint`]: Q-table checkpoints with metadata, pruning and resume
//! - [`ui`]: Text board view and terminal human seat
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
pub mod ui;
