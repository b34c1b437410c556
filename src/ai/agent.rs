use crate::error::AgentError;
use crate::game::{Action, GameState};

/// Whether a match feeds rewards back into the value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Epsilon-greedy selection and table updates.
    Training,
    /// Pure exploitation, no updates.
    Play,
}

impl Mode {
    pub fn is_training(self) -> bool {
        self == Mode::Training
    }
}

/// A seat controller outside the learner: a human at the terminal, a
/// scripted baseline, a test double.
pub trait Agent {
    /// Pick one of `legal` for the active seat of `state`. `legal` is never empty.
    fn select_action(&mut self, state: &GameState, legal: &[Action]) -> Result<Action, AgentError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

impl<A: Agent + ?Sized> Agent for &mut A {
    fn select_action(&mut self, state: &GameState, legal: &[Action]) -> Result<Action, AgentError> {
        (**self).select_action(state, legal)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
