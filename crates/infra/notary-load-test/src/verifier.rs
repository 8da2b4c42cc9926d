//! Read-back of notarized records.

use std::time::Duration;

use alloy_primitives::{B256, TxHash};
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use indicatif::ProgressBar;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    context::RunContext,
    ledger::{LedgerClient, RecordSource},
    submitter::SubmissionResult,
    violation::Violation,
};

/// Default number of record lookups in flight at once.
pub const DEFAULT_READ_CONCURRENCY: usize = 64;

/// A record read back from the ledger for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Payload index.
    pub payload_index: usize,
    /// Hash that was submitted.
    pub expected_hash: B256,
    /// Hash found on the ledger.
    pub observed_hash: B256,
    /// Timestamp found on the ledger.
    pub ledger_timestamp: DateTime<Utc>,
}

impl VerificationRecord {
    /// Whether the ledger returned the submitted hash.
    pub fn hash_matches(&self) -> bool {
        self.expected_hash == self.observed_hash
    }
}

/// Lookup result for one accepted submission. `record` is `None` when no answer came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLookup {
    /// Payload index.
    pub payload_index: usize,
    /// Record, if one was returned.
    pub record: Option<VerificationRecord>,
}

/// Results of the read phase.
#[derive(Debug, Clone)]
pub struct ReadPhase {
    /// One lookup per accepted submission, in submission order.
    pub lookups: Vec<RecordLookup>,
    /// Span from the first query issued to the last answer received.
    pub duration: Duration,
}

impl ReadPhase {
    /// Number of lookups that returned a record.
    pub fn answered(&self) -> usize {
        self.lookups.iter().filter(|l| l.record.is_some()).count()
    }

    /// One violation per record whose hash differs from the submitted one.
    pub fn hash_mismatches(&self) -> Vec<Violation> {
        self.lookups
            .iter()
            .filter_map(|l| l.record)
            .filter(|r| !r.hash_matches())
            .map(|r| Violation::HashMismatch {
                index: r.payload_index,
                expected: r.expected_hash,
                observed: r.observed_hash,
            })
            .collect()
    }
}

/// Queries the ledger for every accepted submission.
#[derive(Debug, Clone, Copy)]
pub struct RecordVerifier {
    concurrency: usize,
}

impl Default for RecordVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_READ_CONCURRENCY)
    }
}

impl RecordVerifier {
    /// Creates a verifier issuing at most `concurrency` lookups at once.
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// Looks up every accepted submission in `source`. Failed submissions are
    /// skipped; lookup errors are not retried and count as missing answers.
    pub async fn verify_all(
        &self,
        ledger: &dyn LedgerClient,
        source: &dyn RecordSource,
        ctx: &RunContext,
        submissions: &[SubmissionResult],
        progress: &ProgressBar,
    ) -> ReadPhase {
        let targets: Vec<_> = submissions
            .iter()
            .filter_map(|s| s.handle().map(|handle| (s.payload_index, s.payload_hash, handle)))
            .collect();
        info!(
            lookups = targets.len(),
            concurrency = self.concurrency,
            source = source.name(),
            "starting read phase"
        );

        let start = Instant::now();
        let lookups: Vec<RecordLookup> = stream::iter(targets)
            .map(|(index, hash, handle)| async move {
                let lookup = Self::verify_one(ledger, source, ctx, index, hash, handle).await;
                progress.inc(1);
                lookup
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        let phase = ReadPhase { lookups, duration: start.elapsed() };

        info!(
            answered = phase.answered(),
            missing = phase.lookups.len() - phase.answered(),
            duration_ms = phase.duration.as_millis() as u64,
            "read phase completed"
        );
        phase
    }

    async fn verify_one(
        ledger: &dyn LedgerClient,
        source: &dyn RecordSource,
        ctx: &RunContext,
        payload_index: usize,
        expected_hash: B256,
        handle: TxHash,
    ) -> RecordLookup {
        let record = match source.lookup(ledger, ctx, handle, expected_hash).await {
            Ok(Some(record)) => {
                debug!(index = payload_index, %handle, "record found");
                Some(VerificationRecord {
                    payload_index,
                    expected_hash,
                    observed_hash: record.hash,
                    ledger_timestamp: record.timestamp,
                })
            }
            Ok(None) => {
                warn!(index = payload_index, %handle, "no record for transaction");
                None
            }
            Err(err) => {
                warn!(index = payload_index, %handle, error = %err, "record lookup failed");
                None
            }
        };
        RecordLookup { payload_index, record }
    }
}
