use anyhow::{Context as _, Result};
use futures::{StreamExt as _, TryStreamExt as _, stream};
use serde::{Deserialize, Serialize};

use crate::{
    evaluation::{ConversationEvaluator, Judgement},
    models::ModelProvider,
};

use super::{RunSettings, ValidationRow};

/// A single evaluator judgement next to the human labels of the same answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub follow_up: Option<String>,
    pub understanding: Judgement,
    pub correctness: Judgement,
    pub completeness: Judgement,
    pub is_accepted: bool,
    pub score: i64,
}

/// Judges every labelled answer once, with `settings.model` as the evaluator
#[tracing::instrument(skip_all, fields(evaluator = %settings.model, rows = rows.len()))]
pub async fn validate(
    settings: &RunSettings,
    provider: &dyn ModelProvider,
    rows: &[ValidationRow],
) -> Result<Vec<ValidationRecord>> {
    let evaluator = ConversationEvaluator::new(settings.prompt.clone(), settings.evaluation_retries);

    let records: Vec<ValidationRecord> = stream::iter(rows.iter().enumerate())
        .map(|(index, row)| {
            let evaluator = &evaluator;
            async move {
                let mut judge = provider.load(&settings.model)?;
                let conversation = [row.question.clone(), row.answer.clone()];

                let evaluation = evaluator
                    .evaluate(judge.as_mut(), &conversation)
                    .await
                    .with_context(|| format!("Failed to validate row {}", index + 1))?;

                Ok::<_, anyhow::Error>(ValidationRecord {
                    follow_up: evaluation.follow_up,
                    understanding: evaluation.understanding,
                    correctness: evaluation.correctness,
                    completeness: evaluation.completeness,
                    is_accepted: row.is_accepted,
                    score: row.answer_score,
                })
            }
        })
        .buffered(settings.concurrency.max(1))
        .try_collect()
        .await?;

    let agreeing = records
        .iter()
        .filter(|record| record.correctness.as_bool() == Some(record.is_accepted))
        .count();
    tracing::info!(
        "{agreeing}/{total} correctness judgements agree with acceptance",
        total = records.len()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{ScriptedProvider, evaluator_reply, test_prompt};

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_validate_passes_labels_through() {
        let provider = ScriptedProvider::new().with_model(
            "judge",
            [evaluator_reply("What about lifetimes?", "Yes", "Yes", "No")],
        );
        let settings = RunSettings::builder()
            .model("judge")
            .prompt(test_prompt())
            .build()
            .unwrap();
        let rows = vec![
            ValidationRow {
                question: "How do I borrow?".to_string(),
                answer: "Use a reference.".to_string(),
                is_accepted: true,
                answer_score: 7,
            },
            ValidationRow {
                question: "What is a box?".to_string(),
                answer: "A heap pointer.".to_string(),
                is_accepted: false,
                answer_score: -1,
            },
        ];

        let records = validate(&settings, &provider, &rows).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            ValidationRecord {
                follow_up: Some("What about lifetimes?".to_string()),
                understanding: Judgement::Yes,
                correctness: Judgement::Yes,
                completeness: Judgement::No,
                is_accepted: true,
                score: 7,
            }
        );
        assert!(!records[1].is_accepted);
        assert_eq!(records[1].score, -1);
    }

    #[test]
    fn test_absent_judgements_serialize_as_null() {
        let record = ValidationRecord {
            follow_up: None,
            understanding: Judgement::Absent,
            correctness: Judgement::No,
            completeness: Judgement::Yes,
            is_accepted: false,
            score: 0,
        };

        insta::assert_snapshot!(serde_json::to_string(&record).unwrap(), @r#"{"follow_up":null,"understanding":null,"correctness":false,"completeness":true,"is_accepted":false,"score":0}"#);
    }
}
