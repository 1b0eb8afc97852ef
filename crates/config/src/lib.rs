//! Task and [`RunConfig`] types consumed by every other crate in the
//! workspace, plus a small TOML config loader in the style of
//! `aigent-config::AppConfig::load_from`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A task submitted by a client: the instruction to reason about, plus any
/// free-form constraints the proposer/evaluator/finalizer prompts should
/// honor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Task {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
}

impl Task {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self { instruction: instruction.into(), constraints: None }
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = Some(constraints.into());
        self
    }
}

/// Selectable search-frontier policy. New variants extend this enum rather
/// than a string-keyed registry (see `spec.md` §9, "string-keyed strategy
/// registry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BeamSearch,
    BestFirstSearch,
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::BeamSearch
    }
}

/// Weights applied to each raw evaluation dimension when computing a node's
/// composite score. Not required to sum to 1 — the evaluator normalizes by
/// their sum at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationWeights {
    pub progress: f64,
    pub promise: f64,
    pub confidence: f64,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self { progress: 1.0, promise: 1.0, confidence: 1.0 }
    }
}

impl EvaluationWeights {
    fn sum(&self) -> f64 {
        self.progress + self.promise + self.confidence
    }
}

/// Termination conditions checked in CHECK_STOP, in priority order (after
/// `cancelled`, `max_nodes`, `max_time`): `score_threshold`, `empty_frontier`,
/// `depth_exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConditions {
    pub max_nodes: u32,
    pub max_time_seconds: f64,
    pub score_threshold: f64,
}

impl Default for StopConditions {
    fn default() -> Self {
        Self { max_nodes: 200, max_time_seconds: 120.0, score_threshold: 9.5 }
    }
}

/// Semantic cache tuning: similarity threshold for a lookup hit and the
/// FIFO eviction bound per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub similarity_threshold: f64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { similarity_threshold: 0.95, max_entries: 4096 }
    }
}

/// Full run configuration. Unknown TOML keys are ignored (`#[serde(default)]`
/// on every nested struct), matching the teacher's `AppConfig` loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: StrategyKind,
    pub max_depth: u32,
    pub branching_factor: u32,
    pub beam_width: u32,
    pub propose_temp: f64,
    pub value_temp: f64,
    pub finalize_temp: f64,
    pub evaluation_weights: EvaluationWeights,
    pub stop_conditions: StopConditions,
    pub embedding_dim: u32,
    pub cache: CacheConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            max_depth: 5,
            branching_factor: 3,
            beam_width: 3,
            propose_temp: 0.7,
            value_temp: 0.2,
            finalize_temp: 0.0,
            evaluation_weights: EvaluationWeights::default(),
            stop_conditions: StopConditions::default(),
            embedding_dim: 8,
            cache: CacheConfig::default(),
        }
    }
}

/// Errors that reject a run before it ever reaches the engine
/// (`start_run`'s only error kind, per `spec.md` §7).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render TOML config: {0}")]
    Render(#[from] toml::ser::Error),
}

impl RunConfig {
    /// Rejects configurations that cannot possibly run. This is the
    /// `invalid_config` boundary from `spec.md` §6/§7 — everything that
    /// passes here is guaranteed to reach `start_run` and run the engine at
    /// least through `INITIALIZE`/`CHECK_STOP` once.
    ///
    /// `max_depth == 0` and `branching_factor == 0` are *not* rejected: they
    /// are documented boundary behaviors (finalize-on-root and
    /// empty-frontier-after-first-check, respectively — see `spec.md` §8).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidConfig("embedding_dim must be positive".into()));
        }
        if self.beam_width == 0 && self.strategy == StrategyKind::BeamSearch {
            return Err(ConfigError::InvalidConfig(
                "beam_width must be positive for beam_search".into(),
            ));
        }
        if !(self.propose_temp.is_finite() && (0.0..=2.0).contains(&self.propose_temp)) {
            return Err(ConfigError::InvalidConfig("propose_temp must be in [0,2]".into()));
        }
        if !(self.value_temp.is_finite() && (0.0..=2.0).contains(&self.value_temp)) {
            return Err(ConfigError::InvalidConfig("value_temp must be in [0,2]".into()));
        }
        if !(self.finalize_temp.is_finite() && (0.0..=2.0).contains(&self.finalize_temp)) {
            return Err(ConfigError::InvalidConfig("finalize_temp must be in [0,2]".into()));
        }
        let weights = self.evaluation_weights;
        if weights.progress < 0.0 || weights.promise < 0.0 || weights.confidence < 0.0 {
            return Err(ConfigError::InvalidConfig("evaluation_weights must be non-negative".into()));
        }
        if weights.sum() <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "evaluation_weights must have a positive sum".into(),
            ));
        }
        if !(self.cache.similarity_threshold > 0.0 && self.cache.similarity_threshold <= 1.0) {
            return Err(ConfigError::InvalidConfig(
                "cache.similarity_threshold must be in (0,1]".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidConfig("cache.max_entries must be positive".into()));
        }
        if self.stop_conditions.max_nodes == 0 {
            return Err(ConfigError::InvalidConfig(
                "stop_conditions.max_nodes must be positive".into(),
            ));
        }
        if self.stop_conditions.max_time_seconds < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "stop_conditions.max_time_seconds must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Load a `RunConfig` from a TOML file, falling back to defaults for any
    /// missing file or missing keys. Mirrors `AppConfig::load_from`: a
    /// missing file is not an error, a malformed one is.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Normalized weights, `Σ = 1.0`. Used by the evaluator's composite
    /// score formula.
    pub fn normalized_weights(&self) -> HashMap<&'static str, f64> {
        let sum = self.evaluation_weights.sum().max(f64::EPSILON);
        HashMap::from([
            ("progress", self.evaluation_weights.progress / sum),
            ("promise", self.evaluation_weights.promise / sum),
            ("confidence", self.evaluation_weights.confidence / sum),
        ])
    }
}
