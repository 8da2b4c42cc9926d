//! Aggregation of a run's findings into a single outcome.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{config::TestParams, violation::Violation};

/// Final result of a run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    /// True when no violation was recorded.
    pub success: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Parameters the run used.
    pub params: TestParams,
    /// Write phase duration in milliseconds.
    pub write_duration_ms: u64,
    /// Read phase duration in milliseconds.
    pub read_duration_ms: u64,
    /// Transactions accepted by the ledger.
    pub submitted: usize,
    /// Records read back.
    pub verified: usize,
    /// Every finding, in the order it was produced.
    pub violations: Vec<Violation>,
}

impl TestOutcome {
    /// Average write time per payload in milliseconds.
    pub fn average_write_ms(&self) -> f64 {
        self.write_duration_ms as f64 / self.params.file_nb.max(1) as f64
    }

    /// Average read time per payload in milliseconds.
    pub fn average_read_ms(&self) -> f64 {
        self.read_duration_ms as f64 / self.params.file_nb.max(1) as f64
    }
}

/// Everything the pipeline found, grouped by phase.
#[derive(Debug, Clone, Default)]
pub struct Findings {
    /// Measured write phase duration.
    pub write_duration: Duration,
    /// Measured read phase duration.
    pub read_duration: Duration,
    /// Accepted transactions.
    pub submitted: usize,
    /// Records read back.
    pub verified: usize,
    /// Failed submissions.
    pub submission: Vec<Violation>,
    /// Write budget overrun.
    pub write_timing: Option<Violation>,
    /// Missing answers, ordering and hash findings.
    pub verification: Vec<Violation>,
    /// Read budget overrun.
    pub read_timing: Option<Violation>,
}

/// Composes findings into a [`TestOutcome`]. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    started_at: DateTime<Utc>,
    params: TestParams,
}

impl ReportAggregator {
    /// Creates an aggregator for a run started at `started_at` with `params`.
    pub const fn new(started_at: DateTime<Utc>, params: TestParams) -> Self {
        Self { started_at, params }
    }

    /// Builds the outcome. Success is false if any violation was recorded.
    pub fn aggregate(self, findings: Findings) -> TestOutcome {
        let violations: Vec<Violation> = findings
            .submission
            .into_iter()
            .chain(findings.write_timing)
            .chain(findings.verification)
            .chain(findings.read_timing)
            .collect();

        TestOutcome {
            success: violations.is_empty(),
            started_at: self.started_at,
            params: self.params,
            write_duration_ms: findings.write_duration.as_millis() as u64,
            read_duration_ms: findings.read_duration.as_millis() as u64,
            submitted: findings.submitted,
            verified: findings.verified,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> ReportAggregator {
        ReportAggregator::new(Utc::now(), TestParams::default().with_file_nb(4))
    }

    #[test]
    fn clean_findings_succeed() {
        let outcome = aggregator().aggregate(Findings {
            write_duration: Duration::from_millis(800),
            read_duration: Duration::from_millis(400),
            submitted: 4,
            verified: 4,
            ..Default::default()
        });
        assert!(outcome.success);
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.average_write_ms(), 200.0);
        assert_eq!(outcome.average_read_ms(), 100.0);
    }

    #[test]
    fn violations_keep_phase_order() {
        let outcome = aggregator().aggregate(Findings {
            submission: vec![Violation::SubmissionFailed { index: 1, cause: "x".into() }],
            write_timing: Some(Violation::WritingTimeExceeded { elapsed_ms: 2, budget_ms: 1 }),
            verification: vec![Violation::AnswerNotReceived { index: 2 }],
            read_timing: Some(Violation::ReadingTimeExceeded { elapsed_ms: 2, budget_ms: 1 }),
            ..Default::default()
        });
        assert!(!outcome.success);
        assert!(matches!(outcome.violations[0], Violation::SubmissionFailed { .. }));
        assert!(matches!(outcome.violations[1], Violation::WritingTimeExceeded { .. }));
        assert!(matches!(outcome.violations[2], Violation::AnswerNotReceived { .. }));
        assert!(matches!(outcome.violations[3], Violation::ReadingTimeExceeded { .. }));
    }

    #[test]
    fn timing_overrun_alone_fails_the_run() {
        let outcome = aggregator().aggregate(Findings {
            read_timing: Some(Violation::ReadingTimeExceeded { elapsed_ms: 9, budget_ms: 1 }),
            ..Default::default()
        });
        assert!(!outcome.success);
        assert_eq!(outcome.violations.len(), 1);
    }
}
