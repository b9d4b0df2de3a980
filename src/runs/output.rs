use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

static NON_SLUG_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").expect("Invalid slug regex"));

/// Writes run results as json lines into an output directory
#[derive(Debug)]
pub struct EvalOutput {
    output_dir: PathBuf,
}

impl EvalOutput {
    /// Creates the output directory if it does not exist yet
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;

        Ok(Self { output_dir })
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes one record per line to `<file_stem>.jsonl`, replacing an existing file
    pub fn write_records<T: Serialize>(&self, file_stem: &str, records: &[T]) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{file_stem}.jsonl"));

        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        for record in records {
            serde_json::to_writer(&mut file, record).context("Failed to serialize record")?;
            file.write_all(b"\n")?;
        }
        file.flush()?;

        tracing::info!(path = %path.display(), records = records.len(), "Wrote results");

        Ok(path)
    }
}

/// Lowercases and replaces every run of characters other than ascii letters, digits, `_` and `-`
/// with a single `-`
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowercase = name.to_lowercase();
    NON_SLUG_CHARACTERS
        .replace_all(&lowercase, "-")
        .trim_matches('-')
        .to_string()
}

/// `<model>___<max_steps>___vs___<evaluator>___and___<evaluator>___<date>`, slugified
#[must_use]
pub fn evaluation_file_name(
    model: &str,
    max_steps: usize,
    evaluators: &[String],
    date: NaiveDate,
) -> String {
    slugify(&format!(
        "{model}___{max_steps}___vs___{}___{date}",
        evaluators.join("___and___")
    ))
}

/// `<model>___<date>`, slugified
#[must_use]
pub fn validation_file_name(model: &str, date: NaiveDate) -> String {
    slugify(&format!("{model}___{date}"))
}
