use anyhow::{Context as _, Result};
use futures::{StreamExt as _, TryStreamExt as _, stream};
use serde::{Deserialize, Serialize};

use crate::{
    conversation::{ConversationDriver, RandomPicker},
    evaluation::ConversationEvaluator,
    metrics::{self, EvaluationMetrics},
    models::ModelProvider,
};

use super::{EvaluationRow, RunSettings};

/// The outcome of driving a single question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub conversation: Vec<String>,
    pub complete: bool,
    #[serde(flatten)]
    pub metrics: EvaluationMetrics,
}

/// Drives a conversation for every question
///
/// Every question gets its own model and evaluators. Up to `concurrency` questions run at the
/// same time; records come back in question order.
#[tracing::instrument(skip_all, fields(model = %settings.model, questions = questions.len()))]
pub async fn evaluate(
    settings: &RunSettings,
    provider: &dyn ModelProvider,
    questions: &[EvaluationRow],
) -> Result<Vec<EvaluationRecord>> {
    let records: Vec<EvaluationRecord> = stream::iter(questions.iter().enumerate())
        .map(|(index, row)| evaluate_question(settings, provider, index, row))
        .buffered(settings.concurrency.max(1))
        .try_collect()
        .await?;

    let complete = records.iter().filter(|record| record.complete).count();
    tracing::info!(
        "{complete}/{total} conversations complete",
        total = records.len()
    );

    Ok(records)
}

async fn evaluate_question(
    settings: &RunSettings,
    provider: &dyn ModelProvider,
    index: usize,
    row: &EvaluationRow,
) -> Result<EvaluationRecord> {
    let mut model = provider.load(&settings.model)?;
    let mut judges = provider.load_all(&settings.evaluators)?;

    // Every question draws from its own sequence so results do not depend on scheduling
    let seed = settings.seed.map(|seed| seed.wrapping_add(index as u64));

    let mut driver = ConversationDriver::new(
        ConversationEvaluator::new(settings.prompt.clone(), settings.evaluation_retries),
        Box::new(RandomPicker::new(seed)),
        settings.max_steps,
    );

    let result = driver
        .run(&row.question, model.as_mut(), &mut judges)
        .await
        .with_context(|| format!("Failed to evaluate question {}", index + 1))?;

    let metrics = metrics::summarize(&result.log);
    tracing::info!(question = index + 1, state = %result.state, ?metrics, "Evaluated question");

    Ok(EvaluationRecord {
        question: row.question.clone(),
        complete: result.is_successful(),
        conversation: result.conversation,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{ScriptedProvider, evaluator_reply, test_prompt};

    use super::*;

    fn settings(concurrency: usize) -> RunSettings {
        RunSettings::builder()
            .model("model")
            .evaluators(vec!["judge".to_string()])
            .max_steps(3_usize)
            .concurrency(concurrency)
            .seed(1_u64)
            .prompt(test_prompt())
            .build()
            .unwrap()
    }

    fn questions() -> Vec<EvaluationRow> {
        ["first", "second", "third"]
            .into_iter()
            .map(|question| EvaluationRow {
                question: question.to_string(),
            })
            .collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_evaluate_every_question() {
        let provider = ScriptedProvider::new()
            .with_model("model", ["answer", "better answer"])
            .with_model(
                "judge",
                [
                    evaluator_reply("Can you elaborate?", "Yes", "No", "No"),
                    evaluator_reply("", "Yes", "Yes", "Yes"),
                ],
            );

        let records = evaluate(&settings(2), &provider, &questions())
            .await
            .unwrap();

        assert_eq!(
            records
                .iter()
                .map(|record| record.question.as_str())
                .collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );

        for record in &records {
            assert!(record.complete);
            assert_eq!(
                record.conversation,
                vec![
                    record.question.clone(),
                    "answer".to_string(),
                    "Can you elaborate?".to_string(),
                    "better answer".to_string(),
                ]
            );
            assert_eq!(
                record.metrics,
                EvaluationMetrics {
                    steps_total: 2,
                    steps_to_understanding: 1,
                    steps_to_correctness: 2,
                    steps_to_completeness: 2,
                }
            );
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_model_fails() {
        let provider = ScriptedProvider::new().with_model("judge", ["unused"]);

        let error = evaluate(&settings(1), &provider, &questions())
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Model model not found in the available models"
        );
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = EvaluationRecord {
            question: "q".to_string(),
            conversation: vec!["q".to_string(), "a".to_string()],
            complete: false,
            metrics: EvaluationMetrics {
                steps_total: 1,
                steps_to_understanding: 1,
                steps_to_correctness: 1,
                steps_to_completeness: 1,
            },
        };

        insta::assert_snapshot!(serde_json::to_string(&record).unwrap(), @r#"{"question":"q","conversation":["q","a"],"complete":false,"steps_total":1,"steps_to_understanding":1,"steps_to_correctness":1,"steps_to_completeness":1}"#);
    }
}
