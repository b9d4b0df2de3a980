//! Summarizes an evaluation log into how many steps each criterion took
use serde::{Deserialize, Serialize};

use crate::evaluation::{EvaluationLog, StepConsensus};

/// Steps, counted from one, until a criterion held for the rest of the conversation
///
/// A criterion that does not hold at the last step reports `steps_total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub steps_total: usize,
    pub steps_to_understanding: usize,
    pub steps_to_correctness: usize,
    pub steps_to_completeness: usize,
}

/// Summarizes a log; an empty log has no steps and reports zero everywhere
#[must_use]
pub fn summarize(log: &EvaluationLog) -> EvaluationMetrics {
    let consensus = log.consensus_by_step();

    let Some(last) = consensus.last() else {
        return EvaluationMetrics::default();
    };
    let steps_total = last.step + 1;

    let steps_to = |criterion: fn(&StepConsensus) -> bool| {
        sustained_since(&consensus, criterion).map_or(steps_total, |step| step + 1)
    };

    EvaluationMetrics {
        steps_total,
        steps_to_understanding: steps_to(|c| c.understanding_all),
        steps_to_correctness: steps_to(|c| c.correctness_all),
        steps_to_completeness: steps_to(|c| c.completeness_any),
    }
}

/// The step from which `criterion` holds up to and including the last step
fn sustained_since(
    consensus: &[StepConsensus],
    criterion: fn(&StepConsensus) -> bool,
) -> Option<usize> {
    let last = consensus.last()?;
    if !criterion(last) {
        return None;
    }

    let first_sustained = consensus
        .iter()
        .rposition(|c| !criterion(c))
        .map_or(0, |last_failure| last_failure + 1);

    Some(consensus[first_sustained].step)
}

#[cfg(test)]
mod tests {
    use crate::evaluation::{Evaluation, Verdict};

    use super::*;

    fn log_from(series: &[[Option<bool>; 3]]) -> EvaluationLog {
        let mut log = EvaluationLog::new();
        for (step, [understanding, correctness, completeness]) in series.iter().enumerate() {
            log.push(Verdict::new(
                "judge",
                step,
                Evaluation {
                    follow_up: None,
                    understanding: (*understanding).into(),
                    correctness: (*correctness).into(),
                    completeness: (*completeness).into(),
                },
            ));
        }
        log
    }

    fn understanding_series(series: &[bool]) -> EvaluationLog {
        let series = series
            .iter()
            .map(|value| [Some(*value), Some(true), Some(true)])
            .collect::<Vec<_>>();
        log_from(&series)
    }

    #[test]
    fn test_sustained_after_failures() {
        let metrics = summarize(&understanding_series(&[false, false, true, true]));

        assert_eq!(metrics.steps_total, 4);
        assert_eq!(metrics.steps_to_understanding, 3);
        assert_eq!(metrics.steps_to_correctness, 1);
    }

    #[test]
    fn test_flipping_back_counts_as_never_achieved() {
        let metrics = summarize(&understanding_series(&[true, false]));

        assert_eq!(metrics.steps_total, 2);
        assert_eq!(metrics.steps_to_understanding, metrics.steps_total);
    }

    #[test]
    fn test_never_true() {
        let metrics = summarize(&understanding_series(&[false, false, false]));

        assert_eq!(metrics.steps_to_understanding, 3);
    }

    #[test]
    fn test_only_the_last_run_counts() {
        let metrics = summarize(&understanding_series(&[true, false, true, false, true]));

        assert_eq!(metrics.steps_to_understanding, 5);
    }

    #[test]
    fn test_absent_judgements_follow_consensus() {
        // Absent understanding is vacuously true, absent completeness vacuously false
        let metrics = summarize(&log_from(&[
            [None, Some(false), None],
            [None, Some(true), Some(true)],
        ]));

        assert_eq!(
            metrics,
            EvaluationMetrics {
                steps_total: 2,
                steps_to_understanding: 1,
                steps_to_correctness: 2,
                steps_to_completeness: 2,
            }
        );
    }

    #[test]
    fn test_multiple_evaluators_per_step() {
        let mut log = EvaluationLog::new();
        let evaluation = |completeness: bool| Evaluation {
            follow_up: None,
            understanding: Some(true).into(),
            correctness: Some(true).into(),
            completeness: Some(completeness).into(),
        };
        log.push(Verdict::new("first", 0, evaluation(false)));
        log.push(Verdict::new("second", 0, evaluation(true)));

        let metrics = summarize(&log);

        assert_eq!(metrics.steps_total, 1);
        assert_eq!(metrics.steps_to_completeness, 1);
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(
            summarize(&EvaluationLog::new()),
            EvaluationMetrics::default()
        );
    }
}
