//! Policies deciding when verification may start after the write phase.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::{config::DEFAULT_FINALITY_DELAY, context::RunContext, ledger::LedgerClient};

/// Waits until submitted transactions are expected to be readable.
#[async_trait]
pub trait FinalityPolicy: Send + Sync + fmt::Debug {
    /// Returns once verification may begin. Never fails the run.
    async fn await_finality(&self, ledger: &dyn LedgerClient, ctx: &RunContext);
}

/// Sleeps for a fixed delay.
///
/// This approximates block-inclusion latency only; it gives no finality guarantee.
/// Transactions still pending after the delay show up as missing answers.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayFinalityPolicy {
    delay: Duration,
}

impl FixedDelayFinalityPolicy {
    /// Creates a policy sleeping for `delay`.
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelayFinalityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FINALITY_DELAY)
    }
}

#[async_trait]
impl FinalityPolicy for FixedDelayFinalityPolicy {
    async fn await_finality(&self, _ledger: &dyn LedgerClient, _ctx: &RunContext) {
        info!(delay_ms = self.delay.as_millis() as u64, "waiting fixed delay for block inclusion");
        sleep(self.delay).await;
    }
}

/// Polls every submitted handle until all are readable or the deadline passes.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPollingFinalityPolicy {
    interval: Duration,
    timeout: Duration,
}

impl ReceiptPollingFinalityPolicy {
    /// Creates a policy polling every `interval` for at most `timeout`.
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

#[async_trait]
impl FinalityPolicy for ReceiptPollingFinalityPolicy {
    async fn await_finality(&self, ledger: &dyn LedgerClient, ctx: &RunContext) {
        let deadline = Instant::now() + self.timeout;
        let mut pending = ctx.handles().to_vec();
        info!(pending = pending.len(), "polling for transaction inclusion");

        loop {
            let mut still_pending = Vec::with_capacity(pending.len());
            for handle in pending {
                if !matches!(ledger.get_transaction_record(ctx, handle).await, Ok(Some(_))) {
                    still_pending.push(handle);
                }
            }
            pending = still_pending;

            if pending.is_empty() {
                info!("all transactions included");
                return;
            }
            if Instant::now() >= deadline {
                warn!(pending = pending.len(), "inclusion deadline passed, verifying anyway");
                return;
            }
            sleep(self.interval).await;
        }
    }
}
