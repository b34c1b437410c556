use std::fmt;
use std::str::FromStr;

use crate::game::{Board, GameState, Position, Seat, PIECES_PER_SEAT};

/// Encoder granularity, loadable from the `[encoder]` config section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// How far behind an own piece an opponent still counts as a threat.
    pub capture_range: usize,
    /// Threat distances per bucket.
    pub threat_bucket_width: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            capture_range: 6,
            threat_bucket_width: 3,
        }
    }
}

/// Seat-relative learning state: the dice, how far each own piece has come,
/// and how closely an opponent is chasing it.
///
/// Textual form: `d<dice>:p<p0>,<p1>,<p2>,<p3>:t<t0>,<t1>,<t2>,<t3>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LearningStateKey {
    pub dice: u8,
    /// 0 = in yard, otherwise steps moved + 1.
    pub progress: [u8; PIECES_PER_SEAT],
    /// 0 = no threat, 1 = nearest chaser closest.
    pub threat: [u8; PIECES_PER_SEAT],
}

impl fmt::Display for LearningStateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [p0, p1, p2, p3] = self.progress;
        let [t0, t1, t2, t3] = self.threat;
        write!(f, "d{}:p{p0},{p1},{p2},{p3}:t{t0},{t1},{t2},{t3}", self.dice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed state key {key:?}: {reason}")]
pub struct KeyParseError {
    pub key: String,
    pub reason: &'static str,
}

impl FromStr for LearningStateKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| KeyParseError {
            key: s.to_string(),
            reason,
        };
        let mut parts = s.split(':');
        let (Some(dice), Some(progress), Some(threat), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err("expected three ':'-separated fields"));
        };

        let dice = dice
            .strip_prefix('d')
            .and_then(|d| d.parse::<u8>().ok())
            .filter(|d| (1..=6).contains(d))
            .ok_or_else(|| err("dice must be d1..d6"))?;
        let progress = parse_quad(progress, 'p').ok_or_else(|| err("bad progress field"))?;
        let threat = parse_quad(threat, 't').ok_or_else(|| err("bad threat field"))?;

        Ok(LearningStateKey {
            dice,
            progress,
            threat,
        })
    }
}

fn parse_quad(field: &str, prefix: char) -> Option<[u8; PIECES_PER_SEAT]> {
    let mut out = [0u8; PIECES_PER_SEAT];
    let mut values = field.strip_prefix(prefix)?.split(',');
    for slot in out.iter_mut() {
        *slot = values.next()?.parse().ok()?;
    }
    values.next().is_none().then_some(out)
}

/// Projects a game state onto a [`LearningStateKey`] for one seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEncoder {
    config: EncoderConfig,
}

impl StateEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        StateEncoder { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Number of threat buckets, including the "no threat" bucket.
    pub fn threat_buckets(&self) -> usize {
        self.config.capture_range.div_ceil(self.config.threat_bucket_width) + 1
    }

    /// Upper bound on the number of distinct keys for `board`.
    pub fn key_space_size(&self, board: &Board) -> u64 {
        let progress_codes = board.finish_steps() as u64 + 2;
        let threats = self.threat_buckets() as u64;
        6 * (progress_codes * threats).pow(PIECES_PER_SEAT as u32)
    }

    /// Encode `state` from `perspective`'s point of view.
    pub fn encode(&self, board: &Board, state: &GameState, perspective: Seat) -> LearningStateKey {
        let mut progress = [0u8; PIECES_PER_SEAT];
        let mut threat = [0u8; PIECES_PER_SEAT];

        for (piece, &position) in state.pieces(perspective).iter().enumerate() {
            progress[piece] = board
                .steps_of(position)
                .map_or(0, |steps| (steps + 1).min(u8::MAX as usize) as u8);
            threat[piece] = self.threat_bucket(board, state, perspective, position);
        }

        LearningStateKey {
            dice: state.dice(),
            progress,
            threat,
        }
    }

    fn threat_bucket(&self, board: &Board, state: &GameState, seat: Seat, position: Position) -> u8 {
        let Position::OnTrack { cell, .. } = position else {
            return 0;
        };
        if board.is_safe(cell) {
            return 0;
        }
        let track = board.track_length();
        let nearest = Seat::ALL
            .iter()
            .filter(|&&other| other != seat)
            .flat_map(|&other| state.pieces(other).iter())
            .filter_map(|&pos| match pos {
                Position::OnTrack {
                    cell: from,
                    steps,
                } => {
                    let distance = (cell + track - from) % track;
                    // A chaser turning into its home path first cannot reach us
                    let reachable = steps + distance <= board.last_track_step();
                    (distance > 0 && distance <= self.config.capture_range && reachable)
                        .then_some(distance)
                }
                _ => None,
            })
            .min();

        match nearest {
            Some(distance) => ((distance - 1) / self.config.threat_bucket_width + 1) as u8,
            None => 0,
        }
    }
}

impl Default for StateEncoder {
    fn default() -> Self {
        StateEncoder::new(EncoderConfig::default())
    }
}
