//! Typed judgements produced by evaluators and the log they accumulate into.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A yes/no judgement that may also be missing
///
/// `Absent` means the evaluator reply could not be decoded, which is not the same as `No`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIs,
)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Judgement {
    Yes,
    No,
    #[default]
    Absent,
}

impl Judgement {
    /// Decodes a trimmed section body. Only a bare `yes` or `no` counts, case is ignored.
    #[must_use]
    pub fn from_answer(answer: &str) -> Self {
        if answer.eq_ignore_ascii_case("yes") {
            Judgement::Yes
        } else if answer.eq_ignore_ascii_case("no") {
            Judgement::No
        } else {
            Judgement::Absent
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        self.into()
    }
}

impl From<Option<bool>> for Judgement {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Judgement::Yes,
            Some(false) => Judgement::No,
            None => Judgement::Absent,
        }
    }
}

impl From<Judgement> for Option<bool> {
    fn from(value: Judgement) -> Self {
        match value {
            Judgement::Yes => Some(true),
            Judgement::No => Some(false),
            Judgement::Absent => None,
        }
    }
}

/// The four fields extracted from a single evaluator reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub follow_up: Option<String>,
    pub understanding: Judgement,
    pub correctness: Judgement,
    pub completeness: Judgement,
}

impl Evaluation {
    /// An evaluation is incomplete when a judgement is missing, or when the answer is judged
    /// incomplete without a follow-up question to continue with.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.understanding.is_absent()
            || self.correctness.is_absent()
            || self.completeness.is_absent()
            || (self.completeness.is_no() && self.follow_up.is_none())
    }
}

/// One evaluator's judgement at one step of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub evaluator: String,
    pub step: usize,
    pub follow_up: Option<String>,
    pub understanding: Judgement,
    pub correctness: Judgement,
    pub completeness: Judgement,
}

impl Verdict {
    #[must_use]
    pub fn new(evaluator: impl Into<String>, step: usize, evaluation: Evaluation) -> Self {
        let Evaluation {
            follow_up,
            understanding,
            correctness,
            completeness,
        } = evaluation;

        Self {
            evaluator: evaluator.into(),
            step,
            follow_up,
            understanding,
            correctness,
            completeness,
        }
    }

    /// The follow-up question, if this verdict offers one worth asking
    ///
    /// Only verdicts that do not consider the answer complete offer their question.
    #[must_use]
    pub fn follow_up_candidate(&self) -> Option<&str> {
        if self.completeness.is_yes() {
            return None;
        }

        self.follow_up
            .as_deref()
            .filter(|follow_up| !follow_up.trim().is_empty())
    }
}

/// Step level agreement between all evaluators
///
/// Absent judgements are skipped: `all` over nothing holds, `any` over nothing does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConsensus {
    pub step: usize,
    pub understanding_all: bool,
    pub correctness_all: bool,
    pub completeness_any: bool,
}

impl StepConsensus {
    pub fn from_verdicts<'a>(step: usize, verdicts: impl IntoIterator<Item = &'a Verdict>) -> Self {
        let mut consensus = StepConsensus {
            step,
            understanding_all: true,
            correctness_all: true,
            completeness_any: false,
        };

        for verdict in verdicts {
            consensus.understanding_all &= !verdict.understanding.is_no();
            consensus.correctness_all &= !verdict.correctness.is_no();
            consensus.completeness_any |= verdict.completeness.is_yes();
        }

        consensus
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.understanding_all && self.correctness_all && self.completeness_any
    }
}

/// All verdicts of a single conversation, in the order they were produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationLog {
    verdicts: Vec<Verdict>,
}

impl EvaluationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: Verdict) {
        self.verdicts.push(verdict);
    }

    pub fn extend(&mut self, verdicts: impl IntoIterator<Item = Verdict>) {
        self.verdicts.extend(verdicts);
    }

    #[must_use]
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn for_step(&self, step: usize) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(move |v| v.step == step)
    }

    #[must_use]
    pub fn consensus(&self, step: usize) -> StepConsensus {
        StepConsensus::from_verdicts(step, self.for_step(step))
    }

    /// Consensus for every step that has at least one verdict, ordered by step
    #[must_use]
    pub fn consensus_by_step(&self) -> Vec<StepConsensus> {
        let mut steps: BTreeMap<usize, Vec<&Verdict>> = BTreeMap::new();
        for verdict in &self.verdicts {
            steps.entry(verdict.step).or_default().push(verdict);
        }

        steps
            .into_iter()
            .map(|(step, verdicts)| StepConsensus::from_verdicts(step, verdicts))
            .collect()
    }
}

impl IntoIterator for EvaluationLog {
    type Item = Verdict;
    type IntoIter = std::vec::IntoIter<Verdict>;

    fn into_iter(self) -> Self::IntoIter {
        self.verdicts.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(
        step: usize,
        understanding: Option<bool>,
        correctness: Option<bool>,
        completeness: Option<bool>,
    ) -> Verdict {
        Verdict {
            evaluator: "judge".to_string(),
            step,
            follow_up: None,
            understanding: understanding.into(),
            correctness: correctness.into(),
            completeness: completeness.into(),
        }
    }

    #[test]
    fn test_judgement_from_answer() {
        assert_eq!(Judgement::from_answer("Yes"), Judgement::Yes);
        assert_eq!(Judgement::from_answer("YES"), Judgement::Yes);
        assert_eq!(Judgement::from_answer("no"), Judgement::No);
        assert_eq!(Judgement::from_answer("Yes."), Judgement::Absent);
        assert_eq!(Judgement::from_answer(""), Judgement::Absent);
    }

    #[test]
    fn test_judgement_serializes_as_nullable_bool() {
        let json = serde_json::to_string(&[Judgement::Yes, Judgement::No, Judgement::Absent])
            .unwrap();
        assert_eq!(json, "[true,false,null]");

        let parsed: Vec<Judgement> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![Judgement::Yes, Judgement::No, Judgement::Absent]);
    }

    #[test]
    fn test_incomplete_evaluations() {
        let complete = Evaluation {
            follow_up: None,
            understanding: Judgement::Yes,
            correctness: Judgement::Yes,
            completeness: Judgement::Yes,
        };
        assert!(!complete.is_incomplete());

        let missing_correctness = Evaluation {
            correctness: Judgement::Absent,
            ..complete.clone()
        };
        assert!(missing_correctness.is_incomplete());

        let incomplete_without_question = Evaluation {
            completeness: Judgement::No,
            ..complete.clone()
        };
        assert!(incomplete_without_question.is_incomplete());

        let incomplete_with_question = Evaluation {
            follow_up: Some("What about errors?".to_string()),
            completeness: Judgement::No,
            ..complete
        };
        assert!(!incomplete_with_question.is_incomplete());
    }

    #[test]
    fn test_consensus_of_nothing_is_vacuous() {
        let consensus = StepConsensus::from_verdicts(0, std::iter::empty::<&Verdict>());

        assert!(consensus.understanding_all);
        assert!(consensus.correctness_all);
        assert!(!consensus.completeness_any);
        assert!(!consensus.should_stop());
    }

    #[test]
    fn test_consensus_skips_absent() {
        let verdicts = [
            verdict(0, None, Some(true), None),
            verdict(0, Some(true), None, Some(true)),
        ];
        let consensus = StepConsensus::from_verdicts(0, &verdicts);

        assert!(consensus.understanding_all);
        assert!(consensus.correctness_all);
        assert!(consensus.completeness_any);
        assert!(consensus.should_stop());
    }

    #[test]
    fn test_consensus_all_absent() {
        let verdicts = [verdict(0, None, None, None), verdict(0, None, None, None)];
        let consensus = StepConsensus::from_verdicts(0, &verdicts);

        assert!(consensus.understanding_all);
        assert!(consensus.correctness_all);
        assert!(!consensus.completeness_any);
    }

    #[test]
    fn test_consensus_single_disagreement_blocks_all() {
        let verdicts = [
            verdict(0, Some(true), Some(true), Some(false)),
            verdict(0, Some(false), Some(true), Some(true)),
        ];
        let consensus = StepConsensus::from_verdicts(0, &verdicts);

        assert!(!consensus.understanding_all);
        assert!(consensus.correctness_all);
        assert!(consensus.completeness_any);
        assert!(!consensus.should_stop());
    }

    #[test]
    fn test_follow_up_candidate() {
        let mut with_question = verdict(0, Some(true), Some(true), Some(false));
        with_question.follow_up = Some("Can you add tests?".to_string());
        assert_eq!(
            with_question.follow_up_candidate(),
            Some("Can you add tests?")
        );

        // Absent completeness still counts as not complete
        with_question.completeness = Judgement::Absent;
        assert!(with_question.follow_up_candidate().is_some());

        with_question.completeness = Judgement::Yes;
        assert!(with_question.follow_up_candidate().is_none());

        let mut blank = verdict(0, Some(true), Some(true), Some(false));
        blank.follow_up = Some("   \n".to_string());
        assert!(blank.follow_up_candidate().is_none());
    }

    #[test]
    fn test_consensus_by_step_is_ordered() {
        let mut log = EvaluationLog::new();
        log.push(verdict(1, Some(true), Some(true), Some(true)));
        log.push(verdict(0, Some(false), Some(true), Some(false)));
        log.push(verdict(1, Some(true), None, None));

        let consensus = log.consensus_by_step();
        assert_eq!(consensus.len(), 2);
        assert_eq!(consensus[0].step, 0);
        assert!(!consensus[0].understanding_all);
        assert_eq!(consensus[1].step, 1);
        assert!(consensus[1].should_stop());
        assert_eq!(log.consensus(1), consensus[1]);
    }
}
