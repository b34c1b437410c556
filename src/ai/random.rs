use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::agent::Agent;
use crate::error::AgentError;
use crate::game::{Action, GameState};

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn select_action(&mut self, _state: &GameState, legal: &[Action]) -> Result<Action, AgentError> {
        if legal.is_empty() {
            return Err(AgentError::NoLegalActions);
        }
        let idx = self.rng.random_range(0..legal.len());
        Ok(legal[idx])
    }

    fn name(&self) -> &str {
        "Random"
    }
}
