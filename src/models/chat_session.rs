use anyhow::{Context as _, Result};
use async_trait::async_trait;
use swiftide::chat_completion::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, errors::LanguageModelError,
};

use crate::config::BackoffConfiguration;

use super::ChatModel;

/// Recorded as the answer when a provider keeps failing
pub const FALLBACK_ANSWER: &str = "I cannot answer to this prompt.";

/// A conversation with any swiftide chat completion provider
///
/// Providers are stateless, so the full history is sent with every question. Failed requests
/// are retried with exponential backoff as long as the provider reports them as transient; when
/// retries run out, or the error is permanent, the fallback answer is recorded instead and the
/// conversation continues.
pub struct ChatSession {
    model_name: String,
    llm: Box<dyn ChatCompletion>,
    backoff: BackoffConfiguration,
    conversation: Vec<String>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("model_name", &self.model_name)
            .field("backoff", &self.backoff)
            .field("conversation", &self.conversation.len())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(
        model_name: impl Into<String>,
        llm: Box<dyn ChatCompletion>,
        backoff: BackoffConfiguration,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            llm,
            backoff,
            conversation: Vec::new(),
        }
    }

    fn history(&self) -> Vec<ChatMessage> {
        self.conversation
            .iter()
            .enumerate()
            .map(|(index, utterance)| {
                if index % 2 == 0 {
                    ChatMessage::new_user(utterance.clone())
                } else {
                    ChatMessage::new_assistant(Some(utterance.clone()), None)
                }
            })
            .collect()
    }

    #[tracing::instrument(skip_all, fields(model = %self.model_name))]
    async fn complete(&self, request: &ChatCompletionRequest) -> Option<String> {
        let policy: backoff::ExponentialBackoff = self.backoff.into();

        let result = backoff::future::retry(policy, || async {
            let response = self.llm.complete(request).await.map_err(|error| match error {
                LanguageModelError::TransientError(_) => {
                    tracing::warn!(error = %error, "Chat completion failed, retrying");
                    backoff::Error::transient(anyhow::Error::from(error))
                }
                LanguageModelError::PermanentError(_)
                | LanguageModelError::ContextLengthExceeded(_) => {
                    backoff::Error::permanent(anyhow::Error::from(error))
                }
            })?;

            response
                .message
                .filter(|message| !message.is_empty())
                .ok_or_else(|| {
                    tracing::warn!("Chat completion returned no message, retrying");
                    backoff::Error::transient(anyhow::anyhow!("Empty chat completion"))
                })
        })
        .await;

        match result {
            Ok(answer) => Some(answer),
            Err(error) => {
                tracing::error!(error = %error, "Chat completion failed after retries");
                None
            }
        }
    }
}

#[async_trait]
impl ChatModel for ChatSession {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn start_conversation(&mut self, prompt: &str) -> Result<String> {
        self.conversation.clear();
        self.continue_conversation(prompt).await
    }

    async fn continue_conversation(&mut self, prompt: &str) -> Result<String> {
        self.conversation.push(prompt.to_string());

        let request = ChatCompletionRequest::builder()
            .messages(self.history())
            .build()
            .context("Failed to build chat completion request")?;

        let answer = self
            .complete(&request)
            .await
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        self.conversation.push(answer.clone());

        Ok(answer)
    }

    fn current_conversation(&self) -> Vec<String> {
        self.conversation.clone()
    }
}
