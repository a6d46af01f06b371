use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::emotion::DEFAULT_MAX_TEXT_CHARS;
use crate::model::synthetic::{DEFAULT_SAMPLES, DEFAULT_SEED};
use crate::model::{ForestParams, LogisticParams, ModelKind};

/// Set to `true`/`1` to start the engine without any models.
pub const DISABLE_MODELS_ENV: &str = "DISABLE_AI_MODELS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// When false the engine becomes ready without loading models and every
    /// assessment reports them as unavailable.
    pub models_enabled: bool,
    pub emotion: EmotionConfig,
    pub risk_model: RiskModelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_enabled: true,
            emotion: EmotionConfig::default(),
            risk_model: RiskModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub max_text_chars: usize,
    /// JSON lexicon replacing the built-in weights.
    pub lexicon_path: Option<PathBuf>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            lexicon_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiskModelConfig {
    pub kind: ModelKind,
    pub seed: u64,
    pub n_samples: usize,
    /// Pre-trained parameters to load instead of bootstrapping.
    pub parameters_path: Option<PathBuf>,
    pub forest: ForestParams,
    pub logistic: LogisticParams,
}

impl Default for RiskModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            seed: DEFAULT_SEED,
            n_samples: DEFAULT_SAMPLES,
            parameters_path: None,
            forest: ForestParams::default(),
            logistic: LogisticParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid engine config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Load `path` when given, otherwise defaults; then apply the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        let disabled = std::env::var(DISABLE_MODELS_ENV).ok();
        self.with_models_disabled_flag(disabled.as_deref())
    }

    fn with_models_disabled_flag(mut self, flag: Option<&str>) -> Self {
        if let Some(value) = flag {
            if matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                tracing::info!("{DISABLE_MODELS_ENV} set; models will not be loaded");
                self.models_enabled = false;
            }
        }
        self
    }
}
