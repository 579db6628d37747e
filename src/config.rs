use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How snakes pick their moves.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Uniform choice among legal moves; never touches the Oracle.
    Random,
    /// Ask the shared Oracle, which also learns from the outcome.
    #[default]
    Oracle,
}

/// Prior for value-table entries seen for the first time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitValue {
    Zero,
    Uniform { low: f32, high: f32 },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoardConfig {
    /// Interior side length; the grid adds a one-cell wall ring.
    pub side_length: u16,
    /// Population the board refills towards.
    pub initial_snakes: usize,
    pub window_radius: u16,
    pub behavior: Behavior,
    /// Run the full invariant check after every snake update.
    pub self_check: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LearningConfig {
    pub alpha: f32,
    pub gamma: f32,
    pub reward_at_death: f32,
    pub reward_on_eat: f32,
    pub reward_alive: f32,
    pub initial_value: InitValue,
    /// Probability of picking a uniformly random legal move instead of the
    /// greedy one.
    pub epsilon: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SimConfig {
    /// Fixed RNG seed; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub board: BoardConfig,
    pub learning: LearningConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            side_length: 30,
            initial_snakes: 10,
            window_radius: 1,
            behavior: Behavior::Oracle,
            self_check: cfg!(debug_assertions),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            reward_at_death: -10.0,
            reward_on_eat: 10.0,
            reward_alive: 0.0,
            initial_value: InitValue::Uniform { low: -0.01, high: 0.01 },
            epsilon: 0.0,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            bail!("alpha must be in (0, 1], got {}", self.alpha);
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            bail!("gamma must be in [0, 1], got {}", self.gamma);
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            bail!("epsilon must be in [0, 1], got {}", self.epsilon);
        }
        if let InitValue::Uniform { low, high } = self.initial_value {
            if !(low <= high) {
                bail!("initial value range is inverted: {low} > {high}");
            }
        }
        Ok(())
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.board.side_length == 0 || self.board.side_length > 4096 {
            bail!("side_length must be in 1..=4096, got {}", self.board.side_length);
        }
        self.learning.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SimConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Using default config: {err:#}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, text).context("Failed to write config")?;
        Ok(())
    }
}
