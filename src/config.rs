use std::path::Path;

use crate::ai::{AgentConfig, EncoderConfig, QAgent, StateEncoder};
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::game::{Board, BoardConfig, Rules, RulesConfig};
use crate::training::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub rules: RulesConfig,
    pub encoder: EncoderConfig,
    pub agent: AgentConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Board::new(&self.board)?;

        let agent = &self.agent;
        if !(agent.learning_rate > 0.0 && agent.learning_rate <= 1.0) {
            return Err(ConfigError::Validation(
                "agent.learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.discount) {
            return Err(ConfigError::Validation(
                "agent.discount must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.epsilon) {
            return Err(ConfigError::Validation(
                "agent.epsilon must be in [0, 1]".into(),
            ));
        }

        if self.encoder.capture_range == 0 {
            return Err(ConfigError::Validation(
                "encoder.capture_range must be > 0".into(),
            ));
        }
        if self.encoder.threat_bucket_width == 0 {
            return Err(ConfigError::Validation(
                "encoder.threat_bucket_width must be > 0".into(),
            ));
        }

        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.parallel_matches == 0 {
            return Err(ConfigError::Validation(
                "training.parallel_matches must be > 0".into(),
            ));
        }
        if self.training.max_rolls == 0 {
            return Err(ConfigError::Validation(
                "training.max_rolls must be > 0".into(),
            ));
        }
        if self.training.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }
        if self.training.eval_interval > 0 && self.training.eval_games == 0 {
            return Err(ConfigError::Validation(
                "training.eval_games must be > 0 when eval_interval is set".into(),
            ));
        }

        Ok(())
    }

    /// Build the rules engine described by the `[board]` and `[rules]` sections.
    pub fn build_rules(&self) -> Result<Rules, ConfigError> {
        Ok(Rules::new(Board::new(&self.board)?, self.rules.clone()))
    }

    /// Fresh agent with an empty table, per `[agent]` and `[encoder]`.
    pub fn build_agent(&self) -> QAgent {
        QAgent::new(self.agent.clone(), StateEncoder::new(self.encoder.clone()))
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
