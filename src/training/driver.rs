use rand::Rng;

use crate::ai::{Agent, LearningStateKey, Mode, QAgent};
use crate::error::TrainingError;
use crate::game::{Action, GameState, MoveError, MoveEvent, MoveKind, RollOutcome, Rules, Seat, SEATS};

/// Default roll cap after which a match is abandoned.
pub const DEFAULT_MAX_ROLLS: usize = 5_000;

/// Who chooses the moves for one seat.
pub enum Controller<'a> {
    /// The shared Q-learning agent.
    Learner,
    /// Anything else: human input, random baseline, scripted test double.
    External(Box<dyn Agent + 'a>),
}

impl Controller<'_> {
    pub fn is_learner(&self) -> bool {
        matches!(self, Controller::Learner)
    }
}

/// Where the driver is in the turn cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    AwaitingRoll,
    AwaitingAction(Vec<Action>),
    Resolved(MoveEvent),
    GameOver(Option<Seat>),
}

/// Something the observer is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Rolled { seat: Seat, dice: u8 },
    Moved { event: MoveEvent, reward: f64 },
    NoLegalMove { seat: Seat, dice: u8 },
    Forfeited { seat: Seat },
    Finished { winner: Option<Seat> },
}

/// Read-only view of a running match, for rendering or live dashboards.
pub trait MatchObserver {
    fn on_turn(&mut self, state: &GameState, event: &TurnEvent);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub rolls: usize,
    pub moves: usize,
    pub captures: usize,
    pub passes: usize,
    pub forfeits: usize,
    /// Q-table updates applied by this match.
    pub updates: usize,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// `None` when the roll cap abandoned the match.
    pub winner: Option<Seat>,
    pub stats: MatchStats,
    pub final_state: GameState,
}

/// A learner decision waiting for its successor state.
#[derive(Debug, Clone, Copy)]
struct Pending {
    key: LearningStateKey,
    action: Action,
    reward: f64,
}

/// Runs one match as a synchronous turn loop.
///
/// Every learner decision in [`Mode::Training`] yields exactly one Q-update.
/// It is completed when the same seat next rolls (with that roll's key and
/// legal set, or an empty set when the roll passes or forfeits) or when the
/// game ends. Abandoned matches discard their pending decisions.
pub struct MatchDriver<'a, R: Rng> {
    rules: &'a Rules,
    agent: &'a QAgent,
    mode: Mode,
    seats: [Controller<'a>; SEATS],
    observer: Option<&'a mut dyn MatchObserver>,
    rng: R,
    state: GameState,
    phase: Phase,
    pending: [Option<Pending>; SEATS],
    stats: MatchStats,
    max_rolls: usize,
}

impl<'a, R: Rng> MatchDriver<'a, R> {
    pub fn new(rules: &'a Rules, agent: &'a QAgent, mode: Mode, seats: [Controller<'a>; SEATS], rng: R) -> Self {
        MatchDriver {
            rules,
            agent,
            mode,
            seats,
            observer: None,
            rng,
            state: GameState::initial(),
            phase: Phase::AwaitingRoll,
            pending: [None; SEATS],
            stats: MatchStats::default(),
            max_rolls: DEFAULT_MAX_ROLLS,
        }
    }

    /// Four learner seats.
    pub fn self_play(rules: &'a Rules, agent: &'a QAgent, mode: Mode, rng: R) -> Self {
        let seats = [
            Controller::Learner,
            Controller::Learner,
            Controller::Learner,
            Controller::Learner,
        ];
        Self::new(rules, agent, mode, seats, rng)
    }

    pub fn with_observer(mut self, observer: &'a mut dyn MatchObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_max_rolls(mut self, max_rolls: usize) -> Self {
        self.max_rolls = max_rolls;
        self
    }

    /// Start from an arbitrary state instead of the initial one.
    pub fn with_state(mut self, state: GameState) -> Self {
        self.phase = match state.winner() {
            Some(winner) => Phase::GameOver(Some(winner)),
            None => Phase::AwaitingRoll,
        };
        self.state = state;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Advance one phase, drawing the dice from the driver's RNG.
    pub fn step(&mut self) -> Result<&Phase, TrainingError> {
        match &self.phase {
            Phase::AwaitingRoll => {
                let value = self.rng.random_range(1..=6);
                return self.roll_dice(value);
            }
            Phase::AwaitingAction(legal) => {
                let legal = legal.clone();
                self.act(legal)?;
            }
            Phase::Resolved(_) => match self.state.winner() {
                Some(winner) => self.finish(Some(winner)),
                None => self.phase = Phase::AwaitingRoll,
            },
            Phase::GameOver(_) => {}
        }
        Ok(&self.phase)
    }

    /// Roll a chosen dice value for the active seat. Only valid while
    /// awaiting a roll.
    pub fn roll_dice(&mut self, value: u8) -> Result<&Phase, TrainingError> {
        match self.phase {
            Phase::AwaitingRoll => {}
            Phase::GameOver(_) => return Err(MoveError::GameOver.into()),
            _ => return Err(MoveError::AlreadyRolled(self.state.dice()).into()),
        }
        if self.stats.rolls >= self.max_rolls {
            log::debug!("match abandoned after {} rolls", self.stats.rolls);
            self.pending = [None; SEATS];
            self.finish(None);
            return Ok(&self.phase);
        }

        let seat = self.state.active_seat();
        let outcome = self.rules.roll(&mut self.state, value)?;
        self.stats.rolls += 1;
        self.notify(TurnEvent::Rolled { seat, dice: value });

        match outcome {
            RollOutcome::Ready(legal) => {
                self.resolve_pending(seat, &legal);
                self.phase = Phase::AwaitingAction(legal);
            }
            RollOutcome::NoLegalMove => {
                self.stats.passes += 1;
                self.resolve_pending(seat, &[]);
                self.notify(TurnEvent::NoLegalMove { seat, dice: value });
            }
            RollOutcome::Forfeited => {
                self.stats.forfeits += 1;
                self.resolve_pending(seat, &[]);
                self.notify(TurnEvent::Forfeited { seat });
            }
        }
        Ok(&self.phase)
    }

    /// Play the match to the end.
    pub fn run(mut self) -> Result<MatchOutcome, TrainingError> {
        let winner = loop {
            if let Phase::GameOver(winner) = self.step()? {
                break *winner;
            }
        };
        Ok(MatchOutcome {
            winner,
            stats: self.stats,
            final_state: self.state,
        })
    }

    fn act(&mut self, legal: Vec<Action>) -> Result<(), TrainingError> {
        let seat = self.state.active_seat();
        let (action, key) = match &mut self.seats[seat.index()] {
            Controller::Learner => {
                let key = self.agent.encode(self.rules.board(), &self.state, seat);
                let action = self.agent.choose_action(&key, &legal, self.mode, &mut self.rng)?;
                (action, Some(key))
            }
            Controller::External(agent) => {
                let action = agent.select_action(&self.state, &legal)?;
                if !legal.contains(&action) {
                    return Err(TrainingError::IllegalAction { seat, action, legal });
                }
                (action, None)
            }
        };

        let (reward, event) = self.rules.apply_mut(&mut self.state, action)?;
        self.stats.moves += 1;
        if matches!(event.kind, MoveKind::Capture { .. }) {
            self.stats.captures += 1;
        }
        if let Some(key) = key.filter(|_| self.mode.is_training()) {
            self.pending[seat.index()] = Some(Pending { key, action, reward });
        }

        self.notify(TurnEvent::Moved { event, reward });
        self.phase = Phase::Resolved(event);
        Ok(())
    }

    fn resolve_pending(&mut self, seat: Seat, next_legal: &[Action]) {
        let Some(pending) = self.pending[seat.index()].take() else {
            return;
        };
        let next_key = self.agent.encode(self.rules.board(), &self.state, seat);
        if self
            .agent
            .update(&pending.key, pending.action, pending.reward, &next_key, next_legal)
            .is_some()
        {
            self.stats.updates += 1;
        }
    }

    fn finish(&mut self, winner: Option<Seat>) {
        for seat in Seat::ALL {
            self.resolve_pending(seat, &[]);
        }
        self.phase = Phase::GameOver(winner);
        self.notify(TurnEvent::Finished { winner });
    }

    fn notify(&mut self, event: TurnEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_turn(&self.state, &event);
        }
    }
}
