use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use super::agent::Mode;
use super::q_table::QTable;
use super::state_encoding::{LearningStateKey, StateEncoder};
use crate::error::{AgentError, ModelError};
use crate::game::{Action, Board, GameState, Seat};

/// Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: 0.5,
            discount: 0.9,
            epsilon: 0.2,
        }
    }
}

/// Tabular Q-learning agent sharing one value table across seats and matches.
///
/// All methods take `&self`; concurrent matches hold the agent by shared
/// reference and the table serialises writes per entry.
#[derive(Debug)]
pub struct QAgent {
    table: Arc<QTable>,
    config: AgentConfig,
    encoder: StateEncoder,
}

impl QAgent {
    pub fn new(config: AgentConfig, encoder: StateEncoder) -> Self {
        Self::with_table(Arc::new(QTable::new()), config, encoder)
    }

    pub fn with_table(table: Arc<QTable>, config: AgentConfig, encoder: StateEncoder) -> Self {
        QAgent {
            table,
            config,
            encoder,
        }
    }

    pub fn table(&self) -> &Arc<QTable> {
        &self.table
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.config.epsilon = epsilon;
    }

    /// Learning-state key of `state` as seen by `seat`.
    pub fn encode(&self, board: &Board, state: &GameState, seat: Seat) -> LearningStateKey {
        self.encoder.encode(board, state, seat)
    }

    /// Epsilon-greedy choice among `legal`. Play mode never explores. Greedy
    /// ties go to the lowest piece index.
    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        key: &LearningStateKey,
        legal: &[Action],
        mode: Mode,
        rng: &mut R,
    ) -> Result<Action, AgentError> {
        let mut pieces: Vec<usize> = legal.iter().filter_map(|a| a.piece()).collect();
        pieces.sort_unstable();
        pieces.dedup();
        let Some(&first) = pieces.first() else {
            return Err(AgentError::NoLegalActions);
        };

        let epsilon = match mode {
            Mode::Training => self.config.epsilon,
            Mode::Play => 0.0,
        };
        if epsilon > 0.0 && rng.random::<f64>() < epsilon {
            let idx = rng.random_range(0..pieces.len());
            return Ok(Action::Move(pieces[idx]));
        }

        let mut best = first;
        let mut best_value = self.table.value(key, first);
        for &piece in &pieces[1..] {
            let value = self.table.value(key, piece);
            if value > best_value {
                best = piece;
                best_value = value;
            }
        }
        Ok(Action::Move(best))
    }

    /// One-step Q-learning update. An empty `next_legal` (terminal, pass,
    /// forfeit) contributes no future value. Returns the stored value, or
    /// `None` for [`Action::Pass`] which has no entry.
    pub fn update(
        &self,
        key: &LearningStateKey,
        action: Action,
        reward: f64,
        next_key: &LearningStateKey,
        next_legal: &[Action],
    ) -> Option<f64> {
        let piece = action.piece()?;
        let future = self
            .table
            .max_value(next_key, next_legal.iter().filter_map(|a| a.piece()))
            .unwrap_or(0.0);
        let AgentConfig {
            learning_rate,
            discount,
            ..
        } = self.config;

        Some(self.table.update_with(*key, piece, |old| {
            old + learning_rate * (reward + discount * future - old)
        }))
    }

    /// Persist the value table.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        self.table.save(path)?;
        log::info!("{:<32}{:<32}", "saved q-table", path.display());
        Ok(())
    }

    /// Replace the value table with the one stored at `path`. On error the
    /// current table is kept as is. Returns the number of loaded entries.
    pub fn load(&mut self, path: &Path) -> Result<usize, ModelError> {
        let table = QTable::load(path)?;
        let entries = table.len();
        self.table = Arc::new(table);
        log::info!("{:<32}{:<32}", "loaded q-table", format!("{} ({entries} entries)", path.display()));
        Ok(entries)
    }
}

impl Default for QAgent {
    fn default() -> Self {
        QAgent::new(AgentConfig::default(), StateEncoder::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key(dice: u8) -> LearningStateKey {
        LearningStateKey {
            dice,
            progress: [1, 7, 0, 0],
            threat: [0, 0, 0, 0],
        }
    }

    fn all_moves() -> Vec<Action> {
        (0..4).map(Action::Move).collect()
    }

    #[test]
    fn test_choose_action_rejects_empty_legal() {
        let agent = QAgent::default();
        let mut rng = StdRng::seed_from_u64(0);
        let err = agent.choose_action(&key(6), &[], Mode::Play, &mut rng).unwrap_err();
        assert_eq!(err, AgentError::NoLegalActions);
        let err = agent
            .choose_action(&key(6), &[Action::Pass], Mode::Training, &mut rng)
            .unwrap_err();
        assert_eq!(err, AgentError::NoLegalActions);
    }

    #[test]
    fn test_greedy_ties_break_to_lowest_piece() {
        let agent = QAgent::default();
        let mut rng = StdRng::seed_from_u64(0);
        let legal = vec![Action::Move(3), Action::Move(1), Action::Move(2)];
        let action = agent.choose_action(&key(6), &legal, Mode::Play, &mut rng).unwrap();
        assert_eq!(action, Action::Move(1));
    }

    #[test]
    fn test_greedy_picks_highest_value() {
        let agent = QAgent::default();
        agent.table().update_with(key(4), 2, |_| 10.0);
        agent.table().update_with(key(4), 0, |_| 3.0);
        let mut rng = StdRng::seed_from_u64(0);
        let action = agent.choose_action(&key(4), &all_moves(), Mode::Play, &mut rng).unwrap();
        assert_eq!(action, Action::Move(2));

        // Restricted legal set ignores the best illegal entry
        let legal = [Action::Move(0), Action::Move(1)];
        let action = agent.choose_action(&key(4), &legal, Mode::Play, &mut rng).unwrap();
        assert_eq!(action, Action::Move(0));
    }

    #[test]
    fn test_play_mode_ignores_epsilon() {
        let agent = QAgent::new(
            AgentConfig {
                epsilon: 1.0,
                ..Default::default()
            },
            StateEncoder::default(),
        );
        agent.table().update_with(key(5), 3, |_| 1.0);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let action = agent.choose_action(&key(5), &all_moves(), Mode::Play, &mut rng).unwrap();
            assert_eq!(action, Action::Move(3));
        }
    }

    #[test]
    fn test_training_mode_explores_uniformly() {
        let agent = QAgent::new(
            AgentConfig {
                epsilon: 1.0,
                ..Default::default()
            },
            StateEncoder::default(),
        );
        agent.table().update_with(key(5), 3, |_| 1.0);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            let action = agent
                .choose_action(&key(5), &all_moves(), Mode::Training, &mut rng)
                .unwrap();
            counts[action.piece().unwrap()] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800), "counts: {counts:?}");
    }

    #[test]
    fn test_choice_is_reproducible_with_seeded_rng() {
        let agent = QAgent::default();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| {
                    agent
                        .choose_action(&key(2), &all_moves(), Mode::Training, &mut rng)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(9), pick(9));
    }

    #[test]
    fn test_update_rule() {
        let agent = QAgent::new(
            AgentConfig {
                learning_rate: 0.5,
                discount: 0.9,
                epsilon: 0.0,
            },
            StateEncoder::default(),
        );
        agent.table().update_with(key(3), 1, |_| 20.0);
        agent.table().update_with(key(3), 2, |_| 40.0);

        // 0 + 0.5 * (1 + 0.9 * 40 - 0) = 18.5
        let v = agent
            .update(&key(6), Action::Move(0), 1.0, &key(3), &[Action::Move(1), Action::Move(2)])
            .unwrap();
        assert!((v - 18.5).abs() < 1e-12);

        // Only legal next actions count: max is 20
        let v = agent
            .update(&key(1), Action::Move(0), 0.0, &key(3), &[Action::Move(1)])
            .unwrap();
        assert!((v - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_terminal_has_no_future_term() {
        let agent = QAgent::default();
        agent.table().update_with(key(3), 1, |_| 1000.0);
        let v = agent
            .update(&key(6), Action::Move(2), 100.0, &key(3), &[])
            .unwrap();
        assert!((v - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_with_zero_learning_rate_changes_nothing() {
        let agent = QAgent::new(
            AgentConfig {
                learning_rate: 0.0,
                ..Default::default()
            },
            StateEncoder::default(),
        );
        agent.table().update_with(key(4), 0, |_| 12.25);
        let before = agent.table().snapshot();

        for reward in [0.0, 1.0, 50.0, 100.0] {
            agent.update(&key(4), Action::Move(0), reward, &key(4), &all_moves());
            agent.update(&key(2), Action::Move(3), reward, &key(4), &[]);
        }
        assert_eq!(agent.table().value(&key(4), 0), 12.25);
        assert_eq!(agent.table().value(&key(2), 3), 0.0);
        for (entry, value) in before {
            assert_eq!(agent.table().snapshot()[&entry], value);
        }
    }

    #[test]
    fn test_update_pass_is_noop() {
        let agent = QAgent::default();
        assert_eq!(agent.update(&key(1), Action::Pass, 5.0, &key(2), &[]), None);
        assert!(agent.table().is_empty());
    }

    #[test]
    fn test_load_corrupt_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");

        let mut agent = QAgent::default();
        agent.table().update_with(key(6), 1, |_| 4.0);
        agent.save(&good).unwrap();
        std::fs::write(
            &bad,
            r#"{"d6:p1,7,0,0:t0,0,0,0#0": 99.0, "d6:p1,7,0,0:t0,0,0,0#7": 1.0}"#,
        )
        .unwrap();

        assert!(agent.load(&bad).is_err());
        assert_eq!(agent.table().len(), 1);
        assert_eq!(agent.table().value(&key(6), 0), 0.0);
        assert_eq!(agent.table().value(&key(6), 1), 4.0);

        let mut fresh = QAgent::default();
        assert_eq!(fresh.load(&good).unwrap(), 1);
        assert_eq!(fresh.table().value(&key(6), 1), 4.0);
    }
}
