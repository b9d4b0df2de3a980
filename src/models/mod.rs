//! Chat models, both the model under test and the evaluators judging it
//!
//! Every backing provider is wrapped in a [`ChatSession`]; the [`ModelRegistry`] decides which
//! provider serves a model identifier.
mod chat_session;
mod registry;

use anyhow::Result;
use async_trait::async_trait;

pub use chat_session::{ChatSession, FALLBACK_ANSWER};
pub use registry::{ModelRegistry, Provider, SUPPORTED_MODELS};

/// A stateful chat with a single model
///
/// The model owns its conversation; callers only ever see a snapshot of it.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Identifies the model in verdicts and output
    fn model_name(&self) -> &str;

    /// Clears the conversation, then asks the first question
    async fn start_conversation(&mut self, prompt: &str) -> Result<String>;

    /// Asks a question with the conversation so far as context
    async fn continue_conversation(&mut self, prompt: &str) -> Result<String>;

    /// The conversation so far, alternating questions and answers
    fn current_conversation(&self) -> Vec<String>;
}

/// Loads chat models by identifier
///
/// Every call returns a new model with its own conversation.
pub trait ModelProvider: Send + Sync {
    fn load(&self, model_name: &str) -> Result<Box<dyn ChatModel>>;

    fn load_all(&self, model_names: &[String]) -> Result<Vec<Box<dyn ChatModel>>> {
        model_names.iter().map(|name| self.load(name)).collect()
    }
}
