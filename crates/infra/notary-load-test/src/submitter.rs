//! Batched submission of notarization transactions.
//!
//! Submissions are issued without waiting on each other, but once as many are in
//! flight as there are identities in the pool, the whole batch is awaited before
//! anything else is issued. Every identity is used exactly once per batch, so a
//! sender's previous transaction has always completed (and consumed its nonce)
//! before the sender is used again.

use std::time::Duration;

use alloy_primitives::{Address, B256, TxHash};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use indicatif::ProgressBar;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    context::RunContext,
    error::SubmissionError,
    identity::IdentityPool,
    ledger::{LedgerBackend, LedgerClient, TransactionRequest},
    violation::Violation,
    workload::Payload,
};

/// Outcome of submitting one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Index of the payload in submission order.
    pub payload_index: usize,
    /// Hash that was notarized.
    pub payload_hash: B256,
    /// Identity that signed the transaction.
    pub sender: Address,
    /// Transaction handle, or why there is none.
    pub outcome: Result<TxHash, SubmissionError>,
}

impl SubmissionResult {
    /// Whether the ledger accepted the transaction.
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Transaction handle, if accepted.
    pub fn handle(&self) -> Option<TxHash> {
        self.outcome.as_ref().ok().copied()
    }

    /// Failure cause, if rejected.
    pub fn error(&self) -> Option<&SubmissionError> {
        self.outcome.as_ref().err()
    }
}

/// Results of the write phase.
#[derive(Debug, Clone)]
pub struct WritePhase {
    /// One result per payload, in payload order.
    pub results: Vec<SubmissionResult>,
    /// Span from the first submission issued to the last barrier completed.
    pub duration: Duration,
    /// Number of barriers awaited.
    pub batches: usize,
}

impl WritePhase {
    /// Number of accepted transactions.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    /// One violation per failed submission.
    pub fn violations(&self) -> Vec<Violation> {
        self.results
            .iter()
            .filter_map(|r| {
                r.error().map(|err| Violation::SubmissionFailed {
                    index: r.payload_index,
                    cause: err.to_string(),
                })
            })
            .collect()
    }
}

/// Converts payloads into submitted notarization transactions.
#[derive(Debug)]
pub struct NotarizationSubmitter<'a> {
    pool: &'a IdentityPool,
    backend: &'a dyn LedgerBackend,
}

impl<'a> NotarizationSubmitter<'a> {
    /// Creates a submitter signing with `pool` through `backend`.
    pub const fn new(pool: &'a IdentityPool, backend: &'a dyn LedgerBackend) -> Self {
        Self { pool, backend }
    }

    /// Maximum number of submissions in flight at once.
    pub fn batch_width(&self) -> usize {
        self.pool.len()
    }

    /// Submits every payload, never raising on per-payload failures.
    ///
    /// Handles of accepted transactions are appended to `ctx` as each batch
    /// completes.
    pub async fn submit_all(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &mut RunContext,
        payloads: &[Payload],
        progress: &ProgressBar,
    ) -> WritePhase {
        let width = self.batch_width();
        let mut results = Vec::with_capacity(payloads.len());
        let mut batches = 0;

        info!(
            payloads = payloads.len(),
            batch_width = width,
            backend = self.backend.name(),
            "starting write phase"
        );
        let start = Instant::now();

        for (batch, chunk) in payloads.chunks(width).enumerate() {
            let offset = batch * width;
            let issuing: &RunContext = ctx;
            let done = join_all(chunk.iter().enumerate().map(|(i, payload)| {
                // Stamped at issue time so embedded timestamps follow submission order.
                let issued_at = Utc::now();
                self.submit_one(ledger, issuing, offset + i, payload.hash(), issued_at)
            }))
            .await;

            ctx.record_handles(done.iter().filter_map(SubmissionResult::handle));
            batches += 1;
            progress.inc(done.len() as u64);
            debug!(
                batch = batches,
                completed = results.len() + done.len(),
                handles = ctx.handles().len(),
                "batch barrier reached"
            );
            results.extend(done);
        }

        let phase = WritePhase { results, duration: start.elapsed(), batches };
        info!(
            succeeded = phase.succeeded(),
            failed = phase.results.len() - phase.succeeded(),
            batches,
            duration_ms = phase.duration.as_millis() as u64,
            "write phase completed"
        );
        phase
    }

    async fn submit_one(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &RunContext,
        index: usize,
        payload_hash: B256,
        issued_at: DateTime<Utc>,
    ) -> SubmissionResult {
        let sender = self.pool.identity_at(index);
        let outcome = self.try_submit(ledger, ctx, index, payload_hash, issued_at).await;

        match &outcome {
            Ok(handle) => debug!(index, %handle, sender = %sender.address(), "notarization submitted"),
            Err(err) => {
                warn!(index, sender = %sender.address(), error = %err, "notarization failed");
                self.pool.invalidate(sender).await;
            }
        }

        SubmissionResult { payload_index: index, payload_hash, sender: sender.address(), outcome }
    }

    async fn try_submit(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &RunContext,
        index: usize,
        payload_hash: B256,
        issued_at: DateTime<Utc>,
    ) -> Result<TxHash, SubmissionError> {
        let sender = self.pool.identity_at(index);
        let receiver = self.pool.identity_at(index + 1);

        let nonce = self
            .pool
            .next_nonce(ledger, ctx, sender)
            .await
            .map_err(|e| SubmissionError::NonceFetch(e.to_string()))?;

        let request = TransactionRequest {
            sender,
            receiver,
            payload_hash,
            nonce,
            embedded_timestamp: issued_at,
        };
        let signed = self.backend.build(&request, ctx.chain_id())?;

        let handle = ledger
            .submit_transaction(ctx, signed.raw)
            .await
            .map_err(|e| SubmissionError::Rejected(e.to_string()))?;
        if handle != signed.handle {
            warn!(index, local = %signed.handle, remote = %handle, "ledger returned unexpected handle");
        }
        Ok(handle)
    }
}
