use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A question to start a conversation with; other fields in the row are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub question: String,
}

/// An answered question with its human labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRow {
    pub question: String,
    pub answer: String,
    pub is_accepted: bool,
    pub answer_score: i64,
}

/// Reads one json value per line, blank lines are skipped
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data from {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("Invalid row on line {} of {}", index + 1, path.display())
            })
        })
        .collect()
}
