use std::path::Path;

use anyhow::{Context as _, Result};

use crate::templates::Templates;

const START_TEMPLATE: &str = "evaluation_start.md";
const QA_TEMPLATE: &str = "evaluation_qa.md";
const END_TEMPLATE: &str = "evaluation_end.md";

/// The framing used to present a conversation to an evaluator
///
/// The prompt is the start segment, the question/answer segment once for every exchange in the
/// conversation, and the end segment. The question/answer segment is a tera template with
/// `question` and `answer` in its context.
#[derive(Debug, Clone)]
pub struct EvaluationPrompt {
    start: String,
    qa: String,
    end: String,
}

impl EvaluationPrompt {
    pub fn new(start: impl Into<String>, qa: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            qa: qa.into(),
            end: end.into(),
        }
    }

    /// The prompt shipped with the binary
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(
            Templates::get_template(START_TEMPLATE)?,
            Templates::get_template(QA_TEMPLATE)?,
            Templates::get_template(END_TEMPLATE)?,
        ))
    }

    /// Loads the three segments from a directory, using the same file names as the builtin prompt
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt template {}", path.display()))
        };

        Ok(Self::new(read(START_TEMPLATE)?, read(QA_TEMPLATE)?, read(END_TEMPLATE)?))
    }

    /// Uses the prompt from `dir` when given, the builtin prompt otherwise
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::builtin(),
        }
    }

    /// Renders the full evaluation prompt for a conversation
    ///
    /// The conversation alternates questions and answers; an unanswered trailing question is left
    /// out.
    pub fn build(&self, conversation: &[String]) -> Result<String> {
        let mut prompt = self.start.clone();

        for exchange in conversation.chunks_exact(2) {
            let mut context = tera::Context::new();
            context.insert("question", &exchange[0]);
            context.insert("answer", &exchange[1]);

            let rendered = tera::Tera::one_off(&self.qa, &context, false)
                .context("Failed to render question and answer for evaluation")?;
            prompt.push_str(&rendered);
        }

        prompt.push_str(&self.end);

        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn conversation(utterances: &[&str]) -> Vec<String> {
        utterances.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_build_prompt() {
        let prompt = EvaluationPrompt::new(
            "START\n",
            "Q: {{ question }}\nA: {{ answer }}\n",
            "END",
        );

        let rendered = prompt
            .build(&conversation(&[
                "How do I reverse a list?",
                "Use `list.reverse()`.",
                "And without mutating it?",
                "Use `reversed(list)` or `list[::-1]`.",
            ]))
            .unwrap();

        assert_snapshot!(rendered, @r"
        START
        Q: How do I reverse a list?
        A: Use `list.reverse()`.
        Q: And without mutating it?
        A: Use `reversed(list)` or `list[::-1]`.
        END
        ");
    }

    #[test]
    fn test_build_prompt_drops_unanswered_question() {
        let prompt = EvaluationPrompt::new("", "[{{ question }}|{{ answer }}]", "");

        let rendered = prompt
            .build(&conversation(&["q1", "a1", "q2"]))
            .unwrap();

        assert_eq!(rendered, "[q1|a1]");
    }

    #[test]
    fn test_build_prompt_does_not_escape() {
        let prompt = EvaluationPrompt::new("", "{{ question }} {{ answer }}", "");

        let rendered = prompt
            .build(&conversation(&["Is `a < b && c > d` valid?", "<b>yes</b>"]))
            .unwrap();

        assert_eq!(rendered, "Is `a < b && c > d` valid? <b>yes</b>");
    }

    #[test]
    fn test_builtin_prompt_asks_for_all_sections() {
        let prompt = EvaluationPrompt::builtin().unwrap();
        let rendered = prompt
            .build(&conversation(&["question", "answer"]))
            .unwrap();

        for section in crate::evaluation::parser::RESPONSE_SECTIONS {
            assert!(rendered.contains(section), "missing section {section}");
        }
        assert!(rendered.contains("question"));
        assert!(rendered.contains("answer"));
    }

    #[test]
    fn test_builtin_prompt_asks_for_plain_answers() {
        let prompt = EvaluationPrompt::builtin().unwrap();
        let rendered = prompt
            .build(&conversation(&["question", "answer"]))
            .unwrap();

        // Quoted answers would not parse as a judgement
        assert!(!rendered.contains("`Yes`"));
        assert!(!rendered.contains("`No`"));
        assert!(rendered.contains("Answer Yes if"));
    }

    #[test]
    fn test_prompt_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(START_TEMPLATE), "<").unwrap();
        std::fs::write(dir.path().join(QA_TEMPLATE), "{{ question }}={{ answer }}").unwrap();
        std::fs::write(dir.path().join(END_TEMPLATE), ">").unwrap();

        let prompt = EvaluationPrompt::load(Some(dir.path())).unwrap();

        assert_eq!(prompt.build(&conversation(&["1+1", "2"])).unwrap(), "<1+1=2>");
    }

    #[test]
    fn test_prompt_from_dir_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(EvaluationPrompt::from_dir(dir.path()).is_err());
    }
}
