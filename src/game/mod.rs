//! Core Ludo game logic: board topology, seats, game state, and the rules
//! engine that rolls, moves, captures, and detects the winner.

mod board;
mod rules;
mod seat;
mod state;

pub use board::{Board, BoardConfig};
pub use rules::{
    Action, MoveError, MoveEvent, MoveKind, RollOutcome, Rules, RulesConfig, Transition,
    BONUS_ROLL, CAPTURE_REWARD, GOAL_REWARD, MAX_CONSECUTIVE_SIXES, MOVE_REWARD, PASS_REWARD,
};
pub use seat::{Seat, SEATS};
pub use state::{GameState, Position};

pub const PIECES_PER_SEAT: usize = 4;
