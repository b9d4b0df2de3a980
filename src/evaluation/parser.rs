//! Extracts the four labelled sections from an evaluator reply
//!
//! Evaluators are asked to answer with the following headers, in this order:
//!
//! ```text
//! ### Follow-up question
//! ### Understanding
//! ### Correctness
//! ### Completeness
//! ```
//!
//! Headers are matched case-insensitively and with flexible whitespace between their words.
//! Replies that do not contain all four headers in order parse into an evaluation without any
//! fields set.
use std::sync::LazyLock;

use regex::Regex;

use super::verdict::{Evaluation, Judgement};

pub const RESPONSE_SECTIONS: [&str; 4] = [
    "### Follow-up question",
    "### Understanding",
    "### Correctness",
    "### Completeness",
];

static RESPONSE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&response_pattern(&RESPONSE_SECTIONS)).expect("infallible; pattern is static")
});

/// Builds one pattern matching every section header in sequence, capturing the text after each
fn response_pattern(sections: &[&str]) -> String {
    let headers = sections
        .iter()
        .map(|section| {
            let header = section
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s*");

            format!("{header}(.*)")
        })
        .collect::<String>();

    format!("(?is){headers}")
}

#[must_use]
pub fn parse(response: &str) -> Evaluation {
    let Some(captures) = RESPONSE_REGEX.captures(response) else {
        tracing::debug!("Evaluator response did not contain the expected sections");
        return Evaluation::default();
    };

    let section = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str().trim())
            .unwrap_or_default()
    };

    Evaluation {
        follow_up: Some(section(1).to_string()),
        understanding: Judgement::from_answer(section(2)),
        correctness: Judgement::from_answer(section(3)),
        completeness: Judgement::from_answer(section(4)),
    }
}
