use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    evaluation::{ConversationEvaluator, EvaluationLog},
    models::ChatModel,
};

use super::FollowUpPicker;

/// Where a conversation is in its lifecycle
///
/// Everything but `Running` is terminal; only `StoppedSuccess` counts as a success.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIs,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriverState {
    Running,
    StoppedSuccess,
    StoppedNoFollowUp,
    StoppedMaxSteps,
}

/// Outcome of a single driven conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResult {
    /// Questions and answers of the model under test, alternating
    pub conversation: Vec<String>,
    pub state: DriverState,
    pub log: EvaluationLog,
}

impl ConversationResult {
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.state.is_stopped_success()
    }
}

/// Drives the model under test through a conversation until the evaluators are satisfied
///
/// After every answer all evaluators judge the transcript. The conversation stops when every
/// evaluator agrees the question was understood and answered correctly and at least one considers
/// the answer complete. Otherwise one of the offered follow-up questions is asked. Without any
/// follow-up question, or after `max_steps` evaluations, the conversation stops unsuccessfully.
#[derive(Debug)]
pub struct ConversationDriver {
    evaluator: ConversationEvaluator,
    picker: Box<dyn FollowUpPicker>,
    max_steps: usize,
}

impl ConversationDriver {
    #[must_use]
    pub fn new(
        evaluator: ConversationEvaluator,
        picker: Box<dyn FollowUpPicker>,
        max_steps: usize,
    ) -> Self {
        Self {
            evaluator,
            picker,
            max_steps,
        }
    }

    #[tracing::instrument(skip_all, fields(model = %model.model_name()))]
    pub async fn run(
        &mut self,
        question: &str,
        model: &mut dyn ChatModel,
        judges: &mut [Box<dyn ChatModel>],
    ) -> Result<ConversationResult> {
        let mut log = EvaluationLog::new();
        let mut state = DriverState::Running;

        model.start_conversation(question).await?;

        for step in 0..self.max_steps {
            let conversation = model.current_conversation();
            let verdicts = self
                .evaluator
                .evaluate_step(step, &conversation, judges)
                .await?;

            let candidates = verdicts
                .iter()
                .filter_map(|verdict| verdict.follow_up_candidate())
                .map(str::to_string)
                .collect::<Vec<_>>();

            log.extend(verdicts);

            let consensus = log.consensus(step);
            tracing::debug!(?consensus, "Step consensus");

            if consensus.should_stop() {
                state = DriverState::StoppedSuccess;
                break;
            }

            if candidates.is_empty() {
                state = DriverState::StoppedNoFollowUp;
                break;
            }

            let pick = self.picker.pick(candidates.len());
            let follow_up = candidates.get(pick).unwrap_or_else(|| {
                tracing::warn!(
                    pick,
                    candidates = candidates.len(),
                    "Picked follow-up out of range"
                );
                &candidates[0]
            });
            tracing::info!(step, %follow_up, "Asking follow-up question");

            model.continue_conversation(follow_up).await?;
        }

        if state.is_running() {
            state = DriverState::StoppedMaxSteps;
        }

        tracing::info!(%state, steps = log.consensus_by_step().len(), "Conversation finished");

        Ok(ConversationResult {
            conversation: model.current_conversation(),
            state,
            log,
        })
    }
}
