use super::{Position, Seat, SEATS};
use crate::error::ConfigError;

/// Board dimensions, loadable from the `[board]` config section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub track_length: usize,
    pub home_column_length: usize,
    pub star_offset: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            track_length: 52,
            home_column_length: 6,
            star_offset: 8,
        }
    }
}

/// Static board topology shared by every game.
///
/// Track cells are numbered `0..track_length`. Home path cells get ids after
/// the track: seat `s` owns `track_length + s * home_path_len ..` where the
/// last cell of each path is that seat's final home cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    track_length: usize,
    home_path_len: usize,
    safe: Vec<bool>,
    home_paths: [Vec<usize>; SEATS],
}

impl Board {
    /// Build and validate a board.
    pub fn new(config: &BoardConfig) -> Result<Self, ConfigError> {
        let track_length = config.track_length;
        if track_length == 0 || track_length % SEATS != 0 {
            return Err(ConfigError::InvalidBoard(format!(
                "track_length {track_length} must be a positive multiple of {SEATS}"
            )));
        }
        let segment = track_length / SEATS;
        if segment < 2 {
            return Err(ConfigError::InvalidBoard(format!(
                "track_length {track_length} leaves fewer than 2 cells per seat"
            )));
        }
        if config.home_column_length == 0 {
            return Err(ConfigError::InvalidBoard(
                "home_column_length must be > 0".into(),
            ));
        }
        if config.star_offset == 0 || config.star_offset >= segment {
            return Err(ConfigError::InvalidBoard(format!(
                "star_offset {} must be in 1..{segment}",
                config.star_offset
            )));
        }

        let mut safe = vec![false; track_length];
        for seat in 0..SEATS {
            let entry = seat * segment;
            safe[entry] = true;
            safe[entry + config.star_offset] = true;
        }

        let home_path_len = config.home_column_length + 1;
        let home_paths = std::array::from_fn(|seat| {
            let base = track_length + seat * home_path_len;
            (base..base + home_path_len).collect()
        });

        Ok(Board {
            track_length,
            home_path_len,
            safe,
            home_paths,
        })
    }

    /// Number of cells on the shared track
    pub fn track_length(&self) -> usize {
        self.track_length
    }

    /// Track cell where a seat's pieces enter from the yard
    pub fn entry_cell(&self, seat: Seat) -> usize {
        seat.index() * (self.track_length / SEATS)
    }

    /// Check if a track cell is safe from capture.
    /// Cells outside the track (home paths) are never capture targets either.
    pub fn is_safe(&self, cell: usize) -> bool {
        self.safe.get(cell).copied().unwrap_or(true)
    }

    /// Cell ids of a seat's private home path, final home cell last
    pub fn home_path(&self, seat: Seat) -> &[usize] {
        &self.home_paths[seat.index()]
    }

    /// Home column cells plus the final home cell
    pub fn home_path_len(&self) -> usize {
        self.home_path_len
    }

    /// Highest step count on the shared track before turning into the home path.
    pub fn last_track_step(&self) -> usize {
        self.track_length - 2
    }

    /// Step count of the final home cell
    pub fn finish_steps(&self) -> usize {
        self.last_track_step() + self.home_path_len
    }

    /// Position reached by a seat's piece after `steps` cells from its entry.
    /// Returns `None` when `steps` overshoots the final home cell.
    pub fn position_at(&self, seat: Seat, steps: usize) -> Option<Position> {
        if steps <= self.last_track_step() {
            let cell = (self.entry_cell(seat) + steps) % self.track_length;
            Some(Position::OnTrack { cell, steps })
        } else if steps <= self.finish_steps() {
            Some(Position::InHome {
                depth: steps - self.last_track_step(),
            })
        } else {
            None
        }
    }

    /// Steps moved for a piece position (`None` while in the yard)
    pub fn steps_of(&self, position: Position) -> Option<usize> {
        match position {
            Position::InYard => None,
            Position::OnTrack { steps, .. } => Some(steps),
            Position::InHome { depth } => Some(self.last_track_step() + depth),
        }
    }

    /// Check if a position is the final home cell
    pub fn is_finished(&self, position: Position) -> bool {
        matches!(position, Position::InHome { depth } if depth == self.home_path_len)
    }

    /// Board cell id occupied by a seat's piece, for rendering.
    pub fn cell_of(&self, seat: Seat, position: Position) -> Option<usize> {
        match position {
            Position::InYard => None,
            Position::OnTrack { cell, .. } => Some(cell),
            Position::InHome { depth } => self.home_path(seat).get(depth - 1).copied(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new(&BoardConfig::default()).expect("default board config is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_board_dimensions() {
        let board = Board::default();
        assert_eq!(board.track_length(), 52);
        assert_eq!(board.home_path_len(), 7);
        assert_eq!(board.finish_steps(), 57);
    }

    #[test]
    fn test_entry_cells_are_rotationally_symmetric() {
        let board = Board::default();
        assert_eq!(board.entry_cell(Seat::Red), 0);
        assert_eq!(board.entry_cell(Seat::Green), 13);
        assert_eq!(board.entry_cell(Seat::Yellow), 26);
        assert_eq!(board.entry_cell(Seat::Blue), 39);
    }

    #[test]
    fn test_safe_cells() {
        let board = Board::default();
        let safe: Vec<usize> = (0..52).filter(|&c| board.is_safe(c)).collect();
        assert_eq!(safe, vec![0, 8, 13, 21, 26, 34, 39, 47]);
        for seat in Seat::ALL {
            assert!(board.is_safe(board.entry_cell(seat)));
        }
    }

    #[test]
    fn test_home_paths_are_distinct() {
        let board = Board::default();
        let mut all: Vec<usize> = Seat::ALL
            .iter()
            .flat_map(|&s| board.home_path(s).to_vec())
            .collect();
        assert_eq!(all.len(), 28);
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 28);
        assert!(all.iter().all(|&c| c >= 52));
    }

    #[test]
    fn test_position_at_wraps_track() {
        let board = Board::default();
        assert_eq!(
            board.position_at(Seat::Blue, 20),
            Some(Position::OnTrack { cell: 7, steps: 20 })
        );
        assert_eq!(
            board.position_at(Seat::Red, 50),
            Some(Position::OnTrack { cell: 50, steps: 50 })
        );
        assert_eq!(board.position_at(Seat::Red, 51), Some(Position::InHome { depth: 1 }));
        assert_eq!(board.position_at(Seat::Red, 57), Some(Position::InHome { depth: 7 }));
        assert_eq!(board.position_at(Seat::Red, 58), None);
    }

    #[test]
    fn test_steps_roundtrip() {
        let board = Board::default();
        for steps in 0..=board.finish_steps() {
            let pos = board.position_at(Seat::Green, steps).unwrap();
            assert_eq!(board.steps_of(pos), Some(steps));
        }
        assert!(board.is_finished(Position::InHome { depth: 7 }));
        assert!(!board.is_finished(Position::InHome { depth: 6 }));
    }

    #[test]
    fn test_cell_of_home_path() {
        let board = Board::default();
        let pos = Position::InHome { depth: 7 };
        assert_eq!(board.cell_of(Seat::Green, pos), Some(52 + 7 + 6));
        assert_eq!(board.cell_of(Seat::Green, Position::InYard), None);
    }

    #[test]
    fn test_rejects_track_not_divisible_by_seats() {
        let config = BoardConfig {
            track_length: 50,
            ..Default::default()
        };
        assert!(matches!(Board::new(&config), Err(ConfigError::InvalidBoard(_))));
    }

    #[test]
    fn test_rejects_star_outside_segment() {
        let config = BoardConfig {
            star_offset: 13,
            ..Default::default()
        };
        assert!(Board::new(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_home_column() {
        let config = BoardConfig {
            home_column_length: 0,
            ..Default::default()
        };
        assert!(Board::new(&config).is_err());
    }
}
