use std::{path::Path, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context as _, Result};
use ::config::{Config as ConfigRs, Environment, File};
use serde::{Deserialize, Serialize};

use super::{ApiKey, defaults};

/// Configuration for evaluation runs
///
/// Read from a toml file, values can be overwritten with `MT_EVAL_` prefixed environment
/// variables, i.e. `MT_EVAL_MAX_STEPS=3`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The model under test
    #[serde(default)]
    pub model: Option<String>,

    /// Models judging the conversation, in the order they are asked
    #[serde(default = "defaults::default_evaluators")]
    pub evaluators: Vec<String>,

    /// Maximum number of evaluation steps in a single conversation
    #[serde(default = "defaults::default_max_steps")]
    pub max_steps: usize,

    /// Additional attempts when an evaluator reply is missing sections
    #[serde(default = "defaults::default_evaluation_retries")]
    pub evaluation_retries: usize,

    /// Seeds follow-up question selection; unseeded runs are not reproducible
    #[serde(default)]
    pub seed: Option<u64>,

    /// Number of conversations evaluated at the same time
    #[serde(default = "defaults::default_concurrency")]
    pub concurrency: usize,

    /// Sampling temperature sent with every request, to the model under test and the evaluators
    #[serde(default = "defaults::default_temperature")]
    pub temperature: f32,

    /// Directory with a custom evaluation prompt
    #[serde(default)]
    pub prompt_dir: Option<PathBuf>,

    #[serde(default = "defaults::default_evaluation_data")]
    pub evaluation_data: PathBuf,

    #[serde(default = "defaults::default_validation_data")]
    pub validation_data: PathBuf,

    #[serde(default = "defaults::default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "defaults::default_validation_output_dir")]
    pub validation_output_dir: PathBuf,

    #[serde(default = "defaults::default_log_dir")]
    pub log_dir: PathBuf,

    /// Falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub openai_api_key: Option<ApiKey>,

    #[serde(default)]
    pub openai_organization: Option<String>,

    #[serde(default)]
    pub openai_project: Option<String>,

    /// Falls back to `GEMINI_API_KEY`
    #[serde(default)]
    pub gemini_api_key: Option<ApiKey>,

    /// Falls back to `AIMLAPI_KEY`
    #[serde(default)]
    pub aimlapi_api_key: Option<ApiKey>,

    #[serde(default)]
    pub backoff: BackoffConfiguration,
}

/// Retries of failed requests to a model provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfiguration {
    #[serde(default = "defaults::default_initial_interval_sec")]
    pub initial_interval_sec: u64,
    #[serde(default = "defaults::default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "defaults::default_randomization_factor")]
    pub randomization_factor: f64,
    #[serde(default = "defaults::default_max_elapsed_time_sec")]
    pub max_elapsed_time_sec: u64,
}

impl Default for BackoffConfiguration {
    fn default() -> Self {
        Self {
            initial_interval_sec: defaults::default_initial_interval_sec(),
            multiplier: defaults::default_multiplier(),
            randomization_factor: defaults::default_randomization_factor(),
            max_elapsed_time_sec: defaults::default_max_elapsed_time_sec(),
        }
    }
}

impl From<BackoffConfiguration> for backoff::ExponentialBackoff {
    fn from(config: BackoffConfiguration) -> Self {
        backoff::ExponentialBackoffBuilder::default()
            .with_initial_interval(Duration::from_secs(config.initial_interval_sec))
            .with_multiplier(config.multiplier)
            .with_randomization_factor(config.randomization_factor)
            .with_max_elapsed_time(Some(Duration::from_secs(config.max_elapsed_time_sec)))
            .build()
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse configuration")
    }
}

impl Default for Config {
    fn default() -> Self {
        // Every field has a serde default
        toml::from_str("").expect("infallible; empty configuration uses defaults")
    }
}

impl Config {
    /// Loads the configuration from a toml file (if it exists) and the environment
    pub fn load(path: &Path) -> Result<Self> {
        let builder = ConfigRs::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("MT_EVAL")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("evaluators")
                    .try_parsing(true),
            );

        let config: Config = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        Ok(config)
    }

    /// Checks the values that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            anyhow::bail!("`max_steps` must be at least 1");
        }

        if self.concurrency == 0 {
            anyhow::bail!("`concurrency` must be at least 1");
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!("`temperature` must be between 0.0 and 2.0");
        }

        if self.evaluators.is_empty() {
            anyhow::bail!("At least one evaluator is required");
        }

        Ok(())
    }

    /// The model under test; required for evaluation and validation runs
    pub fn model(&self) -> Result<&str> {
        self.model
            .as_deref()
            .context("No model configured, set `model` in the configuration or pass `--model`")
    }

    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    #[must_use]
    pub fn openai_api_key(&self) -> Option<ApiKey> {
        self.openai_api_key
            .clone()
            .or_else(|| ApiKey::from_env("OPENAI_API_KEY"))
    }

    #[must_use]
    pub fn gemini_api_key(&self) -> Option<ApiKey> {
        self.gemini_api_key
            .clone()
            .or_else(|| ApiKey::from_env("GEMINI_API_KEY"))
    }

    #[must_use]
    pub fn aimlapi_api_key(&self) -> Option<ApiKey> {
        self.aimlapi_api_key
            .clone()
            .or_else(|| ApiKey::from_env("AIMLAPI_KEY"))
    }
}
