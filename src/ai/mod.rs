//! The learning side: seat-relative state encoding, the shared Q-table, the
//! epsilon-greedy Q-learning agent, and the `Agent` trait for external seats.

mod agent;
mod q_agent;
mod q_table;
mod random;
pub mod state_encoding;

pub use agent::{Agent, Mode};
pub use q_agent::{AgentConfig, QAgent};
pub use q_table::QTable;
pub use random::RandomAgent;
pub use state_encoding::{EncoderConfig, KeyParseError, LearningStateKey, StateEncoder};
