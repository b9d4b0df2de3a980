//! Evaluation and validation runs over a data set
//!
//! An evaluation run drives a conversation for every question and summarizes it. A validation
//! run judges labelled question/answer pairs once, so evaluator judgements can be compared with
//! the human labels.
mod data;
mod evaluate;
mod output;
mod validate;

use anyhow::Result;
use derive_builder::Builder;

use crate::{config::Config, evaluation::EvaluationPrompt};

pub use data::{EvaluationRow, ValidationRow, read_jsonl};
pub use evaluate::{EvaluationRecord, evaluate};
pub use output::{EvalOutput, evaluation_file_name, slugify, validation_file_name};
pub use validate::{ValidationRecord, validate};

/// Everything a run needs besides the models themselves
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(error = anyhow::Error), setter(into))]
pub struct RunSettings {
    /// The model under test, or the evaluator in a validation run
    pub model: String,
    #[builder(default = "crate::config::defaults::default_evaluators()")]
    pub evaluators: Vec<String>,
    #[builder(default = "crate::config::defaults::default_max_steps()")]
    pub max_steps: usize,
    #[builder(default = "crate::config::defaults::default_evaluation_retries()")]
    pub evaluation_retries: usize,
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    #[builder(default = "crate::config::defaults::default_concurrency()")]
    pub concurrency: usize,
    pub prompt: EvaluationPrompt,
}

impl RunSettings {
    #[must_use]
    pub fn builder() -> RunSettingsBuilder {
        RunSettingsBuilder::default()
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder();
        builder
            .model(config.model()?)
            .evaluators(config.evaluators.clone())
            .max_steps(config.max_steps)
            .evaluation_retries(config.evaluation_retries)
            .concurrency(config.concurrency)
            .prompt(EvaluationPrompt::load(config.prompt_dir.as_deref())?);

        if let Some(seed) = config.seed {
            builder.seed(seed);
        }

        builder.build()
    }
}
