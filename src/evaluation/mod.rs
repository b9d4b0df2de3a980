//! Turning evaluator replies into verdicts
//!
//! Evaluators get the whole conversation in a single prompt and answer with four labelled
//! sections, which are parsed into [`Verdict`]s and collected in an [`EvaluationLog`].
mod evaluator;
pub mod parser;
mod prompt;
mod verdict;

pub use evaluator::ConversationEvaluator;
pub use prompt::EvaluationPrompt;
pub use verdict::{Evaluation, EvaluationLog, Judgement, StepConsensus, Verdict};
