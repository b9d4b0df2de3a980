use anyhow::Result;

use crate::models::ChatModel;

use super::{
    parser,
    prompt::EvaluationPrompt,
    verdict::{Evaluation, Verdict},
};

/// Asks evaluators to judge a conversation
///
/// Every evaluation starts a fresh conversation with the evaluator that contains the complete
/// transcript, so an evaluator never builds up its own view of the conversation.
#[derive(Debug, Clone)]
pub struct ConversationEvaluator {
    prompt: EvaluationPrompt,
    retries: usize,
}

impl ConversationEvaluator {
    #[must_use]
    pub fn new(prompt: EvaluationPrompt, retries: usize) -> Self {
        Self { prompt, retries }
    }

    /// Judges a conversation with a single evaluator
    ///
    /// Incomplete replies are asked again, up to `retries` times. The last evaluation is returned
    /// as-is, complete or not.
    #[tracing::instrument(skip_all, fields(evaluator = %judge.model_name()))]
    pub async fn evaluate(
        &self,
        judge: &mut dyn ChatModel,
        conversation: &[String],
    ) -> Result<Evaluation> {
        let prompt = self.prompt.build(conversation)?;

        let mut attempt = 0;
        loop {
            let response = judge.start_conversation(&prompt).await?;
            let evaluation = parser::parse(&response);

            if !evaluation.is_incomplete() || attempt >= self.retries {
                if evaluation.is_incomplete() {
                    tracing::warn!(
                        ?evaluation,
                        "Evaluator reply still incomplete after {attempt} retries"
                    );
                }
                return Ok(evaluation);
            }

            attempt += 1;
            tracing::debug!(?evaluation, attempt, "Incomplete evaluator reply, asking again");
        }
    }

    /// Judges the conversation at `step` with every evaluator, in order
    pub async fn evaluate_step(
        &self,
        step: usize,
        conversation: &[String],
        judges: &mut [Box<dyn ChatModel>],
    ) -> Result<Vec<Verdict>> {
        let mut verdicts = Vec::with_capacity(judges.len());

        for judge in judges.iter_mut() {
            let evaluation = self.evaluate(judge.as_mut(), conversation).await?;
            let verdict = Verdict::new(judge.model_name(), step, evaluation);

            tracing::info!(
                step,
                evaluator = %verdict.evaluator,
                understanding = %verdict.understanding,
                correctness = %verdict.correctness,
                completeness = %verdict.completeness,
                "Evaluated conversation"
            );

            verdicts.push(verdict);
        }

        Ok(verdicts)
    }
}
