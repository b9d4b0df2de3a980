#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use async_trait::async_trait;
use swiftide::chat_completion::{
    ChatCompletion, ChatCompletionRequest, ChatCompletionResponse, errors::LanguageModelError,
};

use crate::{
    config::BackoffConfiguration,
    conversation::FollowUpPicker,
    evaluation::EvaluationPrompt,
    models::{ChatModel, ModelProvider},
};

/// The builtin evaluation prompt
#[must_use]
pub fn test_prompt() -> EvaluationPrompt {
    EvaluationPrompt::builtin().unwrap()
}

/// Fails right away instead of retrying
#[must_use]
pub fn no_backoff() -> BackoffConfiguration {
    BackoffConfiguration {
        initial_interval_sec: 0,
        multiplier: 1.0,
        randomization_factor: 0.0,
        max_elapsed_time_sec: 0,
    }
}

/// An evaluator reply with all four sections
#[must_use]
pub fn evaluator_reply(
    follow_up: &str,
    understanding: &str,
    correctness: &str,
    completeness: &str,
) -> String {
    indoc::formatdoc! {"
        ### Follow-up question
        {follow_up}

        ### Understanding
        {understanding}

        ### Correctness
        {correctness}

        ### Completeness
        {completeness}
    "}
}

/// A chat model answering from a script
///
/// Fails once the script runs out, so tests notice unexpected calls.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    name: String,
    answers: VecDeque<String>,
    conversation: Vec<String>,
    prompts: Vec<String>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(name: &str, answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            answers: answers.into_iter().map(Into::into).collect(),
            conversation: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Every prompt received, across conversations
    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn start_conversation(&mut self, prompt: &str) -> Result<String> {
        self.conversation.clear();
        self.continue_conversation(prompt).await
    }

    async fn continue_conversation(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());

        let Some(answer) = self.answers.pop_front() else {
            anyhow::bail!("{} has no scripted answers left", self.name);
        };

        self.conversation.push(prompt.to_string());
        self.conversation.push(answer.clone());

        Ok(answer)
    }

    fn current_conversation(&self) -> Vec<String> {
        self.conversation.clone()
    }
}

/// Loads scripted models by name
///
/// Every load starts from the full script, like a fresh model would.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Vec<String>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model<S: Into<String>>(
        mut self,
        name: &str,
        answers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.scripts.insert(
            name.to_string(),
            answers.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl ModelProvider for ScriptedProvider {
    fn load(&self, model_name: &str) -> Result<Box<dyn ChatModel>> {
        let Some(answers) = self.scripts.get(model_name) else {
            anyhow::bail!("Model {model_name} not found in the available models");
        };

        Ok(Box::new(ScriptedModel::new(model_name, answers.clone())))
    }
}

/// Always picks the same candidate, or the last one when there are fewer
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker {
    index: usize,
}

impl FixedPicker {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl FollowUpPicker for FixedPicker {
    fn pick(&mut self, candidates: usize) -> usize {
        self.index.min(candidates.saturating_sub(1))
    }
}

#[derive(Debug, Default)]
struct CompletionState {
    answers: VecDeque<String>,
    history_lengths: Vec<usize>,
}

/// A swiftide chat completion answering from a script
///
/// Clones share their state. Once the script runs out, completions come back without a message.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCompletion {
    state: Arc<Mutex<CompletionState>>,
}

impl ScriptedCompletion {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CompletionState {
                answers: answers.into_iter().map(Into::into).collect(),
                history_lengths: Vec::new(),
            })),
        }
    }

    /// Never produces a message
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of messages in every request received
    #[must_use]
    pub fn history_lengths(&self) -> Vec<usize> {
        self.state.lock().unwrap().history_lengths.clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedCompletion {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LanguageModelError> {
        let answer = {
            let mut state = self.state.lock().unwrap();
            state.history_lengths.push(request.messages().len());
            state.answers.pop_front()
        };

        match answer {
            Some(answer) => ChatCompletionResponse::builder().message(answer).build(),
            None => ChatCompletionResponse::builder().build(),
        }
        .map_err(std::convert::Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
enum FailureKind {
    Transient,
    Permanent,
    ContextLengthExceeded,
}

/// A swiftide chat completion that always fails with the same kind of error
///
/// Clones share the call count.
#[derive(Debug, Clone)]
pub struct FailingCompletion {
    kind: FailureKind,
    calls: Arc<AtomicUsize>,
}

impl FailingCompletion {
    fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn transient() -> Self {
        Self::new(FailureKind::Transient)
    }

    #[must_use]
    pub fn permanent() -> Self {
        Self::new(FailureKind::Permanent)
    }

    #[must_use]
    pub fn context_length_exceeded() -> Self {
        Self::new(FailureKind::ContextLengthExceeded)
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletion for FailingCompletion {
    async fn complete(
        &self,
        _request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LanguageModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Err(match self.kind {
            FailureKind::Transient => LanguageModelError::transient("rate limited"),
            FailureKind::Permanent => LanguageModelError::permanent("invalid api key"),
            FailureKind::ContextLengthExceeded => {
                LanguageModelError::context_length_exceeded("prompt too long")
            }
        })
    }
}
