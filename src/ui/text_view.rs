use std::io::{self, Write};

use crate::game::{Board, GameState, MoveKind, Position, Seat};
use crate::training::{MatchObserver, TurnEvent};

/// One line per seat: each piece's relative progress.
///
/// `Red     [yard] [ 12*] [home 3] [done]`, where `*` marks a safe cell.
pub fn render_state(board: &Board, state: &GameState) -> String {
    let mut out = String::new();
    for seat in Seat::ALL {
        let marker = if seat == state.active_seat() { '>' } else { ' ' };
        let pieces = state
            .pieces(seat)
            .iter()
            .map(|&pos| format!("[{}]", describe_position(board, pos)))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!("{marker} {:<7} {pieces}\n", seat.name()));
    }
    out
}

fn describe_position(board: &Board, position: Position) -> String {
    match position {
        Position::InYard => "yard".to_string(),
        Position::OnTrack { cell, steps } => {
            let safe = if board.is_safe(cell) { "*" } else { " " };
            format!("{steps:>3}{safe}")
        }
        _ if board.is_finished(position) => "done".to_string(),
        Position::InHome { depth } => format!("home {depth}"),
    }
}

/// One-line description of a turn event.
pub fn describe_event(event: &TurnEvent) -> String {
    match event {
        TurnEvent::Rolled { seat, dice } => format!("{} rolls {dice}", seat.name()),
        TurnEvent::Moved { event, reward } => {
            let what = match event.kind {
                MoveKind::ExitYard => "leaves the yard".to_string(),
                MoveKind::Advance => "advances".to_string(),
                MoveKind::Capture { victim, piece } => {
                    format!("captures {} piece {}", victim.name(), piece + 1)
                }
                MoveKind::ReachedHome => "reaches home".to_string(),
            };
            format!("{} piece {} {what} (+{reward})", event.seat.name(), event.piece + 1)
        }
        TurnEvent::NoLegalMove { seat, dice } => format!("{} cannot move with {dice}", seat.name()),
        TurnEvent::Forfeited { seat } => format!("{} rolled three sixes, turn forfeited", seat.name()),
        TurnEvent::Finished { winner: Some(seat) } => format!("{} wins!", seat.name()),
        TurnEvent::Finished { winner: None } => "match abandoned".to_string(),
    }
}

/// Prints every event, and the board after each move.
pub struct TextView<W: Write> {
    board: Board,
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TextView<W> {
    pub fn new(board: Board, out: W) -> Self {
        TextView {
            board,
            out,
            error: None,
        }
    }

    /// First write error, if any, since the last call.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, state: &GameState, event: &TurnEvent) -> io::Result<()> {
        writeln!(self.out, "{}", describe_event(event))?;
        if matches!(event, TurnEvent::Moved { .. } | TurnEvent::Finished { .. }) {
            write!(self.out, "{}", render_state(&self.board, state))?;
        }
        self.out.flush()
    }
}

impl<W: Write> MatchObserver for TextView<W> {
    fn on_turn(&mut self, state: &GameState, event: &TurnEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write(state, event) {
            self.error = Some(e);
        }
    }
}
