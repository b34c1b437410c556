use std::fmt;

use super::{Board, GameState, Position, Seat, PIECES_PER_SEAT};

pub const MOVE_REWARD: f64 = 1.0;
pub const CAPTURE_REWARD: f64 = 50.0;
pub const GOAL_REWARD: f64 = 100.0;
pub const PASS_REWARD: f64 = 0.0;

/// Rolling this value releases a piece from the yard and grants another roll.
pub const BONUS_ROLL: u8 = 6;
/// The third consecutive six forfeits the turn.
pub const MAX_CONSECUTIVE_SIXES: u8 = 3;

/// Rule variants, loadable from the `[rules]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Allow several pieces of one seat on the same non-safe track cell.
    pub stacking: bool,
}

/// Which piece the active seat moves, or the implicit pass when nothing is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Move(usize),
    Pass,
}

impl Action {
    pub fn piece(self) -> Option<usize> {
        match self {
            Action::Move(piece) => Some(piece),
            Action::Pass => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(piece) => write!(f, "piece {}", piece + 1),
            Action::Pass => write!(f, "pass"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("{seat:?} cannot play {action} with dice {dice} (legal: {legal:?})")]
    IllegalAction {
        seat: Seat,
        action: Action,
        dice: u8,
        legal: Vec<Action>,
    },

    #[error("dice has not been rolled")]
    NotRolled,

    #[error("dice already rolled ({0})")]
    AlreadyRolled(u8),

    #[error("invalid dice value {0}")]
    InvalidDice(u8),

    #[error("game is over")]
    GameOver,
}

/// What happened to the moved piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    ExitYard,
    Advance,
    Capture { victim: Seat, piece: usize },
    ReachedHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEvent {
    pub seat: Seat,
    pub piece: usize,
    pub dice: u8,
    pub from: Position,
    pub to: Position,
    pub kind: MoveKind,
}

/// Result of applying an action to a state.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub reward: f64,
    pub event: MoveEvent,
}

/// Result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
    /// The active seat must choose one of these.
    Ready(Vec<Action>),
    /// Nothing is playable; the turn passed without changing any piece.
    NoLegalMove,
    /// Third consecutive six: dice discarded and the turn passed.
    Forfeited,
}

/// Ludo rules over a fixed board.
#[derive(Debug, Clone)]
pub struct Rules {
    board: Board,
    config: RulesConfig,
}

impl Rules {
    pub fn new(board: Board, config: RulesConfig) -> Self {
        Rules { board, config }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Legal actions for the active seat and the rolled dice, ascending by piece.
    pub fn legal_actions(&self, state: &GameState) -> Vec<Action> {
        if state.is_over() || state.dice() == 0 {
            return Vec::new();
        }
        let seat = state.active_seat();
        let dice = state.dice();

        (0..PIECES_PER_SEAT)
            .filter(|&piece| {
                self.destination(state, seat, piece, dice)
                    .is_some_and(|dest| self.accepts(state, seat, dest))
            })
            .map(Action::Move)
            .collect()
    }

    /// Where `piece` lands with `dice`, or `None` if it cannot move at all.
    fn destination(&self, state: &GameState, seat: Seat, piece: usize, dice: u8) -> Option<Position> {
        let position = state.position(seat, piece);
        if self.board.is_finished(position) {
            return None;
        }
        match self.board.steps_of(position) {
            None if dice == BONUS_ROLL => self.board.position_at(seat, 0),
            None => None,
            Some(steps) => self.board.position_at(seat, steps + dice as usize),
        }
    }

    /// Whether `seat` may put another piece on `dest`.
    fn accepts(&self, state: &GameState, seat: Seat, dest: Position) -> bool {
        if self.config.stacking {
            return true;
        }
        match dest {
            Position::OnTrack { cell, .. } if !self.board.is_safe(cell) => {
                state.own_on(seat, cell) == 0
            }
            _ => true,
        }
    }

    /// Record a dice roll for the active seat and resolve the six rules.
    pub fn roll(&self, state: &mut GameState, value: u8) -> Result<RollOutcome, MoveError> {
        if state.is_over() {
            return Err(MoveError::GameOver);
        }
        if !(1..=6).contains(&value) {
            return Err(MoveError::InvalidDice(value));
        }
        if state.dice() != 0 {
            return Err(MoveError::AlreadyRolled(state.dice()));
        }
        let seat = state.active_seat();

        if value == BONUS_ROLL {
            let sixes = state.consecutive_sixes() + 1;
            if sixes >= MAX_CONSECUTIVE_SIXES {
                self.advance_turn(state, seat);
                return Ok(RollOutcome::Forfeited);
            }
            state.set_consecutive_sixes(sixes);
        } else {
            state.set_consecutive_sixes(0);
        }

        state.set_dice(value);
        let legal = self.legal_actions(state);
        if legal.is_empty() {
            state.set_dice(0);
            if value != BONUS_ROLL {
                self.advance_turn(state, seat);
            }
            return Ok(RollOutcome::NoLegalMove);
        }
        state.set_legal(legal.clone());
        Ok(RollOutcome::Ready(legal))
    }

    /// Apply an action and return the new state (immutable)
    pub fn apply(&self, state: &GameState, action: Action) -> Result<Transition, MoveError> {
        let mut next = state.clone();
        let (reward, event) = self.apply_mut(&mut next, action)?;
        Ok(Transition {
            state: next,
            reward,
            event,
        })
    }

    /// Apply an action in place, returning the mover's reward and the event.
    pub fn apply_mut(&self, state: &mut GameState, action: Action) -> Result<(f64, MoveEvent), MoveError> {
        if state.is_over() {
            return Err(MoveError::GameOver);
        }
        if state.dice() == 0 {
            return Err(MoveError::NotRolled);
        }
        let seat = state.active_seat();
        let dice = state.dice();
        let legal = self.legal_actions(state);
        let illegal = |legal: Vec<Action>| MoveError::IllegalAction {
            seat,
            action,
            dice,
            legal,
        };
        if !legal.contains(&action) {
            return Err(illegal(legal));
        }
        let piece = action.piece().ok_or_else(|| illegal(legal.clone()))?;
        let from = state.position(seat, piece);
        let to = self
            .destination(state, seat, piece, dice)
            .ok_or_else(|| illegal(legal.clone()))?;

        state.set_position(seat, piece, to);

        let mut kind = if from == Position::InYard {
            MoveKind::ExitYard
        } else {
            MoveKind::Advance
        };
        let mut reward = MOVE_REWARD;

        if let Position::OnTrack { cell, .. } = to {
            if !self.board.is_safe(cell) {
                let opponents = state.opponents_on(seat, cell);
                if let [(victim, victim_piece)] = opponents[..] {
                    state.set_position(victim, victim_piece, Position::InYard);
                    kind = MoveKind::Capture {
                        victim,
                        piece: victim_piece,
                    };
                    reward = CAPTURE_REWARD;
                }
            }
        }
        if self.board.is_finished(to) {
            kind = MoveKind::ReachedHome;
            reward = GOAL_REWARD;
        }

        state.set_dice(0);
        state.set_legal(Vec::new());

        if let Some(winner) = self.is_terminal(state) {
            state.set_winner(winner);
        } else if dice != BONUS_ROLL {
            self.advance_turn(state, seat);
        }

        let event = MoveEvent {
            seat,
            piece,
            dice,
            from,
            to,
            kind,
        };
        Ok((reward, event))
    }

    /// The seat whose four pieces have all reached home.
    pub fn is_terminal(&self, state: &GameState) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|&seat| self.is_eliminated(state, seat))
    }

    /// A seat with every piece home takes no further turns.
    pub fn is_eliminated(&self, state: &GameState, seat: Seat) -> bool {
        state
            .pieces(seat)
            .iter()
            .all(|&pos| self.board.is_finished(pos))
    }

    /// Next seat after `seat` that still has pieces to move.
    pub(crate) fn next_active(&self, state: &GameState, seat: Seat) -> Seat {
        let mut next = seat.next();
        while next != seat && self.is_eliminated(state, next) {
            next = next.next();
        }
        next
    }

    fn advance_turn(&self, state: &mut GameState, seat: Seat) {
        let next = self.next_active(state, seat);
        state.set_active(next);
        state.set_dice(0);
        state.set_consecutive_sixes(0);
        state.set_legal(Vec::new());
    }
}

impl Default for Rules {
    fn default() -> Self {
        Rules::new(Board::default(), RulesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SEATS;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn yard() -> [[Position; PIECES_PER_SEAT]; SEATS] {
        [[Position::InYard; PIECES_PER_SEAT]; SEATS]
    }

    fn on_track(board: &Board, seat: Seat, steps: usize) -> Position {
        board.position_at(seat, steps).unwrap()
    }

    fn rolled(rules: &Rules, mut state: GameState, dice: u8) -> GameState {
        rules.roll(&mut state, dice).unwrap();
        state
    }

    #[test]
    fn test_six_with_all_pieces_in_yard_gives_four_exits() {
        let rules = Rules::default();
        let mut state = GameState::initial();
        let outcome = rules.roll(&mut state, 6).unwrap();
        assert_eq!(
            outcome,
            RollOutcome::Ready(vec![
                Action::Move(0),
                Action::Move(1),
                Action::Move(2),
                Action::Move(3)
            ])
        );
        assert_eq!(state.cached_legal().len(), 4);
    }

    #[test]
    fn test_non_six_with_all_pieces_in_yard_passes() {
        let rules = Rules::default();
        let mut state = GameState::initial();
        assert_eq!(rules.roll(&mut state, 3).unwrap(), RollOutcome::NoLegalMove);
        assert_eq!(state.active_seat(), Seat::Green);
        assert_eq!(state.dice(), 0);
        assert_eq!(state.pieces(Seat::Red), GameState::initial().pieces(Seat::Red));
    }

    #[test]
    fn test_yard_exit_lands_on_entry_cell() {
        let rules = Rules::default();
        let mut pieces = yard();
        pieces[1][0] = on_track(rules.board(), Seat::Green, 5);
        let state = rolled(&rules, GameState::from_positions(Seat::Green, pieces), 6);
        let t = rules.apply(&state, Action::Move(1)).unwrap();
        assert_eq!(
            t.state.position(Seat::Green, 1),
            Position::OnTrack { cell: 13, steps: 0 }
        );
        assert_eq!(t.event.kind, MoveKind::ExitYard);
        assert_eq!(t.reward, MOVE_REWARD);
        // A six keeps the turn
        assert_eq!(t.state.active_seat(), Seat::Green);
    }

    #[test]
    fn test_capture_on_non_safe_cell() {
        let rules = Rules::default();
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 10);
        // Green piece one cell past its entry: track cell 14, not safe
        pieces[1][0] = on_track(board, Seat::Green, 1);
        assert!(!board.is_safe(14));

        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 4);
        let t = rules.apply(&state, Action::Move(0)).unwrap();

        assert_eq!(t.state.position(Seat::Green, 0), Position::InYard);
        assert_eq!(t.reward, CAPTURE_REWARD);
        assert_eq!(
            t.event.kind,
            MoveKind::Capture {
                victim: Seat::Green,
                piece: 0
            }
        );
        assert_eq!(rules.board().steps_of(t.state.position(Seat::Red, 0)), Some(14));
        assert_eq!(t.state.active_seat(), Seat::Green);
    }

    #[test]
    fn test_no_capture_on_safe_cell() {
        let rules = Rules::default();
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 4);
        // Green at track cell 8, a star cell
        pieces[1][0] = on_track(board, Seat::Green, 47);
        assert!(board.is_safe(8));

        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 4);
        let t = rules.apply(&state, Action::Move(0)).unwrap();
        assert_eq!(t.state.position(Seat::Green, 0), pieces[1][0]);
        assert_eq!(t.event.kind, MoveKind::Advance);
        assert_eq!(t.reward, MOVE_REWARD);
    }

    #[test]
    fn test_no_capture_of_two_opposing_pieces() {
        let rules = Rules::default();
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 10);
        pieces[1][0] = on_track(board, Seat::Green, 1);
        pieces[2][0] = on_track(board, Seat::Yellow, 40);
        assert_eq!(pieces[2][0], Position::OnTrack { cell: 14, steps: 40 });

        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 4);
        let t = rules.apply(&state, Action::Move(0)).unwrap();
        assert_eq!(t.state.position(Seat::Green, 0), pieces[1][0]);
        assert_eq!(t.state.position(Seat::Yellow, 0), pieces[2][0]);
        assert_eq!(t.reward, MOVE_REWARD);
    }

    #[test]
    fn test_overshoot_is_excluded() {
        let rules = Rules::default();
        let mut pieces = yard();
        pieces[0][0] = Position::InHome { depth: 5 }; // steps 55
        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 3);
        assert!(rules.legal_actions(&state).is_empty());

        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 2);
        assert_eq!(rules.legal_actions(&state), vec![Action::Move(0)]);
    }

    #[test]
    fn test_overshoot_roll_passes_turn() {
        let rules = Rules::default();
        let mut pieces = yard();
        pieces[0][0] = Position::InHome { depth: 5 };
        let mut state = GameState::from_positions(Seat::Red, pieces);
        assert_eq!(rules.roll(&mut state, 5).unwrap(), RollOutcome::NoLegalMove);
        assert_eq!(state.active_seat(), Seat::Green);
    }

    #[test]
    fn test_reaching_home_and_winning() {
        let rules = Rules::default();
        let mut pieces = yard();
        pieces[0] = [
            Position::InHome { depth: 7 },
            Position::InHome { depth: 7 },
            Position::InHome { depth: 7 },
            Position::InHome { depth: 6 },
        ];
        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 1);
        assert_eq!(rules.legal_actions(&state), vec![Action::Move(3)]);

        let t = rules.apply(&state, Action::Move(3)).unwrap();
        assert_eq!(t.reward, GOAL_REWARD);
        assert_eq!(t.event.kind, MoveKind::ReachedHome);
        assert_eq!(rules.is_terminal(&t.state), Some(Seat::Red));
        assert_eq!(t.state.winner(), Some(Seat::Red));
        assert!(rules.legal_actions(&t.state).is_empty());
    }

    #[test]
    fn test_apply_rejects_illegal_action() {
        let rules = Rules::default();
        let state = rolled(&rules, GameState::initial(), 6);
        let err = rules.apply(&state, Action::Move(4)).unwrap_err();
        assert!(matches!(err, MoveError::IllegalAction { .. }));
        let err = rules.apply(&state, Action::Pass).unwrap_err();
        assert!(matches!(err, MoveError::IllegalAction { .. }));
    }

    #[test]
    fn test_apply_requires_roll() {
        let rules = Rules::default();
        let err = rules.apply(&GameState::initial(), Action::Move(0)).unwrap_err();
        assert_eq!(err, MoveError::NotRolled);
    }

    #[test]
    fn test_roll_rejects_invalid_values() {
        let rules = Rules::default();
        let mut state = GameState::initial();
        assert_eq!(rules.roll(&mut state, 0), Err(MoveError::InvalidDice(0)));
        assert_eq!(rules.roll(&mut state, 7), Err(MoveError::InvalidDice(7)));
        rules.roll(&mut state, 6).unwrap();
        assert_eq!(rules.roll(&mut state, 2), Err(MoveError::AlreadyRolled(6)));
    }

    #[test]
    fn test_three_sixes_forfeit_turn() {
        let rules = Rules::default();
        let mut state = GameState::initial();

        assert!(matches!(rules.roll(&mut state, 6).unwrap(), RollOutcome::Ready(_)));
        rules.apply_mut(&mut state, Action::Move(0)).unwrap();
        assert_eq!(state.active_seat(), Seat::Red);
        assert_eq!(state.consecutive_sixes(), 1);

        assert!(matches!(rules.roll(&mut state, 6).unwrap(), RollOutcome::Ready(_)));
        rules.apply_mut(&mut state, Action::Move(0)).unwrap();
        assert_eq!(state.consecutive_sixes(), 2);

        let before = *state.pieces(Seat::Red);
        assert_eq!(rules.roll(&mut state, 6).unwrap(), RollOutcome::Forfeited);
        assert_eq!(state.active_seat(), Seat::Green);
        assert_eq!(state.dice(), 0);
        assert_eq!(state.consecutive_sixes(), 0);
        assert_eq!(*state.pieces(Seat::Red), before);
    }

    #[test]
    fn test_non_six_resets_six_counter() {
        let rules = Rules::default();
        let mut state = GameState::initial();
        rules.roll(&mut state, 6).unwrap();
        rules.apply_mut(&mut state, Action::Move(0)).unwrap();
        assert_eq!(state.consecutive_sixes(), 1);

        rules.roll(&mut state, 2).unwrap();
        assert_eq!(state.consecutive_sixes(), 0);
        rules.apply_mut(&mut state, Action::Move(0)).unwrap();
        assert_eq!(state.active_seat(), Seat::Green);
    }

    #[test]
    fn test_stacking_disabled_blocks_own_piece() {
        let rules = Rules::default();
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 10);
        pieces[0][1] = on_track(board, Seat::Red, 7);
        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 3);
        assert_eq!(rules.legal_actions(&state), vec![Action::Move(0)]);
    }

    #[test]
    fn test_stacking_enabled_allows_own_piece() {
        let rules = Rules::new(Board::default(), RulesConfig { stacking: true });
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 10);
        pieces[0][1] = on_track(board, Seat::Red, 7);
        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 3);
        assert_eq!(rules.legal_actions(&state), vec![Action::Move(0), Action::Move(1)]);
    }

    #[test]
    fn test_own_pieces_share_safe_cells() {
        let rules = Rules::default();
        let board = rules.board();
        let mut pieces = yard();
        pieces[0][0] = on_track(board, Seat::Red, 8);
        pieces[0][1] = on_track(board, Seat::Red, 5);
        let state = rolled(&rules, GameState::from_positions(Seat::Red, pieces), 3);
        assert!(rules.legal_actions(&state).contains(&Action::Move(1)));
    }

    #[test]
    fn test_next_active_skips_eliminated_seats() {
        let rules = Rules::default();
        let mut pieces = yard();
        pieces[1] = [Position::InHome { depth: 7 }; PIECES_PER_SEAT];
        let state = GameState::from_positions(Seat::Red, pieces);
        assert_eq!(rules.next_active(&state, Seat::Red), Seat::Yellow);
    }

    /// Drive random legal play and check the rule invariants at every move.
    #[test]
    fn test_random_playouts_respect_invariants() {
        let rules = Rules::default();
        let board = rules.board();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = GameState::initial();

            for _ in 0..3000 {
                if state.is_over() {
                    break;
                }
                let dice = rng.random_range(1..=6);
                let legal = match rules.roll(&mut state, dice).unwrap() {
                    RollOutcome::Ready(legal) => legal,
                    _ => continue,
                };
                let seat = state.active_seat();

                for &action in &legal {
                    let piece = action.piece().unwrap();
                    let before = state.position(seat, piece);
                    let t = rules.apply(&state, action).expect("legal action must apply");

                    let after = t.state.position(seat, piece);
                    let steps = board.steps_of(after).unwrap();
                    assert!(steps <= board.finish_steps(), "overshoot to {steps}");
                    if let Some(prev) = board.steps_of(before) {
                        assert!(steps > prev, "steps must increase");
                    }

                    // Opposing pieces on safe cells never go back to the yard
                    for other in Seat::ALL.into_iter().filter(|&s| s != seat) {
                        for p in 0..PIECES_PER_SEAT {
                            let old = state.position(other, p);
                            if let Position::OnTrack { cell, .. } = old {
                                if board.is_safe(cell) {
                                    assert_eq!(t.state.position(other, p), old);
                                }
                            }
                        }
                    }
                }

                let pick = legal[rng.random_range(0..legal.len())];
                rules.apply_mut(&mut state, pick).unwrap();
            }
        }
    }
}
