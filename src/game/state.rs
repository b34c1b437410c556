use super::{Action, Seat, PIECES_PER_SEAT, SEATS};

/// Where a single piece is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    InYard,
    /// On the shared track, `steps` cells past the seat's entry cell.
    OnTrack { cell: usize, steps: usize },
    /// On the seat's private home path; the deepest cell is the final home.
    InHome { depth: usize },
}

/// Per-game mutable data. Mutated only through [`super::Rules`].
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pieces: [[Position; PIECES_PER_SEAT]; SEATS],
    active: Seat,
    dice: u8,
    consecutive_sixes: u8,
    legal: Vec<Action>,
    winner: Option<Seat>,
}

impl GameState {
    /// Create initial game state: every piece in its yard, Red to roll.
    pub fn initial() -> Self {
        GameState {
            pieces: [[Position::InYard; PIECES_PER_SEAT]; SEATS],
            active: Seat::Red,
            dice: 0,
            consecutive_sixes: 0,
            legal: Vec::new(),
            winner: None,
        }
    }

    /// Build a state with explicit piece positions, awaiting a roll by `active`.
    pub fn from_positions(active: Seat, pieces: [[Position; PIECES_PER_SEAT]; SEATS]) -> Self {
        GameState {
            pieces,
            active,
            ..GameState::initial()
        }
    }

    /// Seat whose turn it is
    pub fn active_seat(&self) -> Seat {
        self.active
    }

    /// Current dice value, 0 if not rolled
    pub fn dice(&self) -> u8 {
        self.dice
    }

    pub fn consecutive_sixes(&self) -> u8 {
        self.consecutive_sixes
    }

    pub fn position(&self, seat: Seat, piece: usize) -> Position {
        self.pieces[seat.index()][piece]
    }

    /// All four piece positions of a seat
    pub fn pieces(&self, seat: Seat) -> &[Position; PIECES_PER_SEAT] {
        &self.pieces[seat.index()]
    }

    /// Legal actions cached by the last roll
    pub fn cached_legal(&self) -> &[Action] {
        &self.legal
    }

    /// Winning seat once the game is over
    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Every piece of any seat other than `seat` standing on track cell `cell`.
    pub fn opponents_on(&self, seat: Seat, cell: usize) -> Vec<(Seat, usize)> {
        Seat::ALL
            .iter()
            .filter(|&&other| other != seat)
            .flat_map(|&other| {
                self.pieces(other)
                    .iter()
                    .enumerate()
                    .filter(move |(_, pos)| {
                        matches!(pos, Position::OnTrack { cell: c, .. } if *c == cell)
                    })
                    .map(move |(piece, _)| (other, piece))
            })
            .collect()
    }

    /// Number of `seat`'s own pieces standing on track cell `cell`.
    pub fn own_on(&self, seat: Seat, cell: usize) -> usize {
        self.pieces(seat)
            .iter()
            .filter(|pos| matches!(pos, Position::OnTrack { cell: c, .. } if *c == cell))
            .count()
    }

    pub(crate) fn set_position(&mut self, seat: Seat, piece: usize, position: Position) {
        self.pieces[seat.index()][piece] = position;
    }

    pub(crate) fn set_dice(&mut self, dice: u8) {
        self.dice = dice;
    }

    pub(crate) fn set_consecutive_sixes(&mut self, count: u8) {
        self.consecutive_sixes = count;
    }

    pub(crate) fn set_active(&mut self, seat: Seat) {
        self.active = seat;
    }

    pub(crate) fn set_legal(&mut self, legal: Vec<Action>) {
        self.legal = legal;
    }

    pub(crate) fn set_winner(&mut self, winner: Seat) {
        self.winner = Some(winner);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}
