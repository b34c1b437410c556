use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::{Mode, QAgent, RandomAgent};
use crate::error::TrainingError;
use crate::game::{Rules, Seat, SEATS};
use crate::training::driver::{Controller, MatchDriver, MatchOutcome};

/// Play one self-play match. The agent controls all four seats and learns
/// from every decision.
pub fn play_self_play_match(
    rules: &Rules,
    agent: &QAgent,
    max_rolls: usize,
    seed: u64,
) -> Result<MatchOutcome, TrainingError> {
    MatchDriver::self_play(rules, agent, Mode::Training, StdRng::seed_from_u64(seed))
        .with_max_rolls(max_rolls)
        .run()
}

/// Play a single evaluation match: the greedy agent in `learner_seat`,
/// random agents in the other three. No updates are made.
pub fn play_eval_match(
    rules: &Rules,
    agent: &QAgent,
    learner_seat: Seat,
    max_rolls: usize,
    seed: u64,
) -> Result<MatchOutcome, TrainingError> {
    let seats = Seat::ALL.map(|seat| {
        if seat == learner_seat {
            Controller::Learner
        } else {
            let opponent_seed = episode_seed(seed, seat.index() + 1);
            Controller::External(Box::new(RandomAgent::seeded(opponent_seed)))
        }
    });
    MatchDriver::new(rules, agent, Mode::Play, seats, StdRng::seed_from_u64(seed))
        .with_max_rolls(max_rolls)
        .run()
}

/// Evaluate agent vs random over N games, rotating the learner's seat.
/// Returns the fraction of games the learner won.
pub fn evaluate(
    rules: &Rules,
    agent: &QAgent,
    eval_games: usize,
    max_rolls: usize,
    base_seed: u64,
) -> Result<f32, TrainingError> {
    if eval_games == 0 {
        return Ok(0.0);
    }
    let mut wins = 0;
    for game_idx in 0..eval_games {
        let learner = Seat::ALL[game_idx % SEATS];
        let outcome = play_eval_match(rules, agent, learner, max_rolls, episode_seed(base_seed, game_idx))?;
        if outcome.winner == Some(learner) {
            wins += 1;
        }
    }
    Ok(wins as f32 / eval_games as f32)
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
