use anyhow::{Context as _, Result};
use async_openai::config::OpenAIConfig;
use swiftide::integrations::openai::{OpenAI, Options};

use crate::config::{ApiKey, Config};

use super::{ChatModel, ChatSession, ModelProvider};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const AIMLAPI_API_BASE: &str = "https://api.aimlapi.com/v1";

/// Services that host the supported models
///
/// All of them are reached through an OpenAI compatible api.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum Provider {
    OpenAI,
    Gemini,
    #[strum(serialize = "AIMLAPI")]
    AimlApi,
}

impl Provider {
    fn api_base(self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => None,
            Provider::Gemini => Some(GEMINI_API_BASE),
            Provider::AimlApi => Some(AIMLAPI_API_BASE),
        }
    }

    fn api_key(self, config: &Config) -> Option<ApiKey> {
        match self {
            Provider::OpenAI => config.openai_api_key(),
            Provider::Gemini => config.gemini_api_key(),
            Provider::AimlApi => config.aimlapi_api_key(),
        }
    }
}

/// Every model that can be evaluated or act as evaluator, with the provider serving it
pub static SUPPORTED_MODELS: &[(&str, Provider)] = &[
    ("gpt-4o", Provider::OpenAI),
    ("gpt-4o-2024-08-06", Provider::OpenAI),
    ("gpt-4o-mini", Provider::OpenAI),
    ("gpt-4-turbo", Provider::OpenAI),
    ("gpt-3.5-turbo", Provider::OpenAI),
    ("gemini-1.5-flash", Provider::Gemini),
    ("gemini-1.5-pro", Provider::Gemini),
    ("gemini-1.0-pro", Provider::Gemini),
    ("codellama/CodeLlama-7b-Instruct-hf", Provider::AimlApi),
    ("codellama/CodeLlama-13b-Instruct-hf", Provider::AimlApi),
    ("codellama/CodeLlama-34b-Instruct-hf", Provider::AimlApi),
    ("codellama/CodeLlama-70b-Instruct-hf", Provider::AimlApi),
    ("togethercomputer/CodeLlama-7b-Instruct", Provider::AimlApi),
    ("togethercomputer/CodeLlama-13b-Instruct", Provider::AimlApi),
    ("togethercomputer/CodeLlama-34b-Instruct", Provider::AimlApi),
    ("deepseek-ai/deepseek-coder-33b-instruct", Provider::AimlApi),
    ("WizardLM/WizardCoder-Python-34B-V1.0", Provider::AimlApi),
    ("meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo", Provider::AimlApi),
    ("meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo", Provider::AimlApi),
];

/// Builds chat sessions for the supported models from the configuration
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    config: Config,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The provider serving a model
    pub fn provider_for(model_name: &str) -> Result<Provider> {
        SUPPORTED_MODELS
            .iter()
            .find(|(name, _)| *name == model_name)
            .map(|(_, provider)| *provider)
            .with_context(|| format!("Model {model_name} not found in the available models"))
    }

    fn build_llm(&self, model_name: &str, provider: Provider) -> Result<OpenAI> {
        let api_key = provider.api_key(&self.config).with_context(|| {
            format!("No api key configured for {provider}, required by {model_name}")
        })?;

        let mut openai_config = OpenAIConfig::default().with_api_key(api_key.expose_secret());

        if let Some(api_base) = provider.api_base() {
            openai_config = openai_config.with_api_base(api_base);
        }

        if provider == Provider::OpenAI {
            if let Some(organization) = &self.config.openai_organization {
                openai_config = openai_config.with_org_id(organization);
            }
            if let Some(project) = &self.config.openai_project {
                openai_config = openai_config.with_project_id(project);
            }
        }

        OpenAI::builder()
            .client(async_openai::Client::with_config(openai_config))
            .default_prompt_model(model_name)
            .default_options(Options::builder().temperature(self.config.temperature))
            .build()
            .with_context(|| format!("Failed to build {provider} client for {model_name}"))
    }
}

impl ModelProvider for ModelRegistry {
    #[tracing::instrument(skip(self), err)]
    fn load(&self, model_name: &str) -> Result<Box<dyn ChatModel>> {
        let provider = Self::provider_for(model_name)?;
        let llm = self.build_llm(model_name, provider)?;

        tracing::debug!(%provider, "Loaded model");

        Ok(Box::new(ChatSession::new(
            model_name,
            Box::new(llm),
            self.config.backoff,
        )))
    }
}
