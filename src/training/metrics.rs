use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::game::{Seat, SEATS};
use crate::training::driver::MatchOutcome;

/// Result of a single self-play match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeResult {
    /// `None` when the match hit the roll cap.
    pub winner: Option<Seat>,
    pub rolls: usize,
    pub moves: usize,
    pub captures: usize,
}

impl From<&MatchOutcome> for EpisodeResult {
    fn from(outcome: &MatchOutcome) -> Self {
        EpisodeResult {
            winner: outcome.winner,
            rolls: outcome.stats.rolls,
            moves: outcome.stats.moves,
            captures: outcome.stats.captures,
        }
    }
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    total_updates: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            total_updates: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_updates(&mut self, updates: usize) {
        self.total_updates += updates;
    }

    fn last(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    fn window(&self, last_n: usize) -> usize {
        self.episode_results.len().min(last_n)
    }

    /// Fraction of the last N matches won by `seat`.
    pub fn win_rate(&self, seat: Seat, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self.last(n).filter(|r| r.winner == Some(seat)).count();
        wins as f32 / n as f32
    }

    /// Win rate of every seat over the last N matches, in seat order.
    pub fn win_rates(&self, last_n: usize) -> [f32; SEATS] {
        Seat::ALL.map(|seat| self.win_rate(seat, last_n))
    }

    /// Fraction of the last N matches abandoned at the roll cap.
    pub fn abandon_rate(&self, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let abandoned = self.last(n).filter(|r| r.winner.is_none()).count();
        abandoned as f32 / n as f32
    }

    /// Average dice rolls per match over the last N matches.
    pub fn average_game_length(&self, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.last(n).map(|r| r.rolls).sum();
        total as f32 / n as f32
    }

    /// Average captures per match over the last N matches.
    pub fn average_captures(&self, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.last(n).map(|r| r.captures).sum();
        total as f32 / n as f32
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Throughput tracker for the batched training loop.
pub struct TimingMetrics {
    batch_micros: VecDeque<u64>,
    capacity: usize,
    window_start: Instant,
    window_count: usize,
    window_overhead_micros: u128, // eval/checkpoint time excluded from throughput
}

impl TimingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TimingMetrics {
            batch_micros: VecDeque::with_capacity(capacity),
            capacity,
            window_start: Instant::now(),
            window_count: 0,
            window_overhead_micros: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Record one batch of `episodes` matches that took `d`.
    pub fn record_batch(&mut self, episodes: usize, d: Duration) {
        self.batch_micros.push_back(d.as_micros() as u64);
        if self.batch_micros.len() > self.capacity {
            self.batch_micros.pop_front();
        }
        self.window_count += episodes;
    }

    /// Record time spent in eval or checkpoint saving so it is excluded from
    /// the throughput window.
    pub fn record_overhead(&mut self, d: Duration) {
        self.window_overhead_micros += d.as_micros();
    }

    /// Mean of the last `last_n` batch times in milliseconds.
    pub fn avg_batch_ms(&self, last_n: usize) -> f32 {
        let n = self.batch_micros.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let mean = self
            .batch_micros
            .iter()
            .rev()
            .take(n)
            .map(|&v| v as f64)
            .sum::<f64>()
            / n as f64;
        (mean / 1000.0) as f32
    }

    /// Episodes per second since the last `reset_window` call, excluding time
    /// spent in eval/checkpoint overhead.
    pub fn episodes_per_sec(&self) -> f32 {
        let total_micros = self.window_start.elapsed().as_micros();
        let net_micros = total_micros.saturating_sub(self.window_overhead_micros);
        if net_micros == 0 {
            return 0.0;
        }
        self.window_count as f32 / (net_micros as f32 / 1_000_000.0)
    }

    /// Reset the throughput window (call after each log interval).
    pub fn reset_window(&mut self) {
        self.window_start = Instant::now();
        self.window_count = 0;
        self.window_overhead_micros = 0;
    }
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
