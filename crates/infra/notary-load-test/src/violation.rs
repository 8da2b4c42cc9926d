//! Findings that make a run fail without aborting it.

use std::fmt;

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A non-fatal finding recorded in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A notarization transaction could not be submitted.
    SubmissionFailed {
        /// Payload index.
        index: usize,
        /// Failure cause.
        cause: String,
    },
    /// No record came back for a submitted transaction.
    AnswerNotReceived {
        /// Payload index.
        index: usize,
    },
    /// A record's timestamp precedes the one of an earlier submission.
    OutOfOrderTimestamp {
        /// Payload index.
        index: usize,
        /// Latest timestamp seen before this record.
        previous: DateTime<Utc>,
        /// Timestamp of this record.
        observed: DateTime<Utc>,
    },
    /// A record carries a different hash than the one submitted.
    HashMismatch {
        /// Payload index.
        index: usize,
        /// Submitted hash.
        expected: B256,
        /// Hash found on the ledger.
        observed: B256,
    },
    /// The write phase ran over budget.
    WritingTimeExceeded {
        /// Measured duration in milliseconds.
        elapsed_ms: u64,
        /// Budget in milliseconds.
        budget_ms: u64,
    },
    /// The read phase ran over budget.
    ReadingTimeExceeded {
        /// Measured duration in milliseconds.
        elapsed_ms: u64,
        /// Budget in milliseconds.
        budget_ms: u64,
    },
}

impl Violation {
    /// Payload index the finding refers to, if it is per-payload.
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::SubmissionFailed { index, .. }
            | Self::AnswerNotReceived { index }
            | Self::OutOfOrderTimestamp { index, .. }
            | Self::HashMismatch { index, .. } => Some(*index),
            Self::WritingTimeExceeded { .. } | Self::ReadingTimeExceeded { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmissionFailed { index, cause } => {
                write!(f, "Error - payload {index} could not be notarized: {cause}")
            }
            Self::AnswerNotReceived { index } => {
                write!(f, "Error - did not receive answer from ledger for payload {index}")
            }
            Self::OutOfOrderTimestamp { index, previous, observed } => write!(
                f,
                "Error - timestamp should be increasing: payload {index} at {} precedes {}",
                observed.to_rfc3339(),
                previous.to_rfc3339()
            ),
            Self::HashMismatch { index, expected, observed } => {
                write!(f, "Error - payload {index} hash mismatch: expected {expected}, found {observed}")
            }
            Self::WritingTimeExceeded { elapsed_ms, budget_ms } => write!(
                f,
                "ERROR - Protocol Writing Time is too big ({elapsed_ms} ms > {budget_ms} ms)"
            ),
            Self::ReadingTimeExceeded { elapsed_ms, budget_ms } => write!(
                f,
                "ERROR - Protocol Reading Time is too big ({elapsed_ms} ms > {budget_ms} ms)"
            ),
        }
    }
}
