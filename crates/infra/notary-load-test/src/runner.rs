//! End-to-end orchestration of a notarization run.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{Instrument, debug, info, info_span};

use crate::{
    artifacts::ArtifactStore,
    config::TestParams,
    context::RunContext,
    error::HarnessError,
    finality::{FinalityPolicy, FixedDelayFinalityPolicy},
    identity::IdentityPool,
    ledger::{
        DataTransferBackend, EmbeddedRecordSource, LedgerBackend, LedgerClient, RecordSource,
        SessionAuthenticator,
    },
    ordering::OrderingValidator,
    report::{Findings, ReportAggregator, TestOutcome},
    submitter::NotarizationSubmitter,
    timing::TimingBudgetEnforcer,
    verifier::{DEFAULT_READ_CONCURRENCY, RecordVerifier},
    workload::WorkloadGenerator,
};

/// Runs generate → submit → wait → verify → validate and aggregates the outcome.
#[derive(Debug)]
pub struct HarnessRunner {
    params: TestParams,
    pool: IdentityPool,
    backend: Box<dyn LedgerBackend>,
    finality: Box<dyn FinalityPolicy>,
    records: Box<dyn RecordSource>,
    artifacts: Option<ArtifactStore>,
    read_concurrency: usize,
    seed: Option<u64>,
    show_progress: bool,
}

impl HarnessRunner {
    /// Creates a runner with the data-transfer backend, the fixed-delay finality
    /// policy and records read from the transactions themselves.
    pub fn new(params: TestParams, pool: IdentityPool) -> Self {
        Self {
            params,
            pool,
            backend: Box::new(DataTransferBackend),
            finality: Box::new(FixedDelayFinalityPolicy::default()),
            records: Box::new(EmbeddedRecordSource),
            artifacts: None,
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            seed: None,
            show_progress: false,
        }
    }

    /// Sets the transaction building backend.
    pub fn with_backend(mut self, backend: impl LedgerBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Sets the finality policy.
    pub fn with_finality(mut self, finality: impl FinalityPolicy + 'static) -> Self {
        self.finality = Box::new(finality);
        self
    }

    /// Sets where the read phase looks records up.
    pub fn with_record_source(mut self, records: impl RecordSource + 'static) -> Self {
        self.records = Box::new(records);
        self
    }

    /// Persists payloads under `store` during the run.
    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Sets the maximum number of concurrent record lookups.
    pub const fn with_read_concurrency(mut self, concurrency: usize) -> Self {
        self.read_concurrency = concurrency;
        self
    }

    /// Makes payload generation reproducible.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Shows progress bars on stderr.
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Executes one run.
    ///
    /// Only login, chain id and artifact I/O failures abort the run; every ledger
    /// fault after login ends up as a violation in the returned outcome.
    pub async fn run(
        &self,
        ledger: &dyn LedgerClient,
        authenticator: &dyn SessionAuthenticator,
    ) -> Result<TestOutcome, HarnessError> {
        self.params.validate()?;

        let chain_id = ledger.chain_id().await.map_err(HarnessError::ChainId)?;
        let session = authenticator.login().await?;
        let mut ctx = RunContext::new(chain_id, session);
        info!(
            chain_id,
            file_nb = self.params.file_nb,
            min_size = self.params.min_size,
            max_size = self.params.max_size,
            identities = self.pool.len(),
            sequencing = ?self.pool.sequencing(),
            backend = self.backend.name(),
            records = self.records.name(),
            "starting notarization run"
        );

        let payloads = match self.seed {
            Some(seed) => WorkloadGenerator::seeded(&self.params, seed),
            None => WorkloadGenerator::new(&self.params),
        }
        .generate();

        let artifact_paths = match &self.artifacts {
            Some(store) => {
                let paths = store.persist(&payloads).await?;
                debug!(
                    dir = %store.dir().display(),
                    files = paths.len(),
                    "payload artifacts written"
                );
                paths
            }
            None => Vec::new(),
        };

        let bar = self.progress_bar("processing files");
        let write = NotarizationSubmitter::new(&self.pool, self.backend.as_ref())
            .submit_all(ledger, &mut ctx, &payloads, &bar)
            .instrument(info_span!("write_phase"))
            .await;
        bar.finish_and_clear();
        drop(payloads);

        if self.params.delete_files
            && let Some(store) = &self.artifacts
        {
            store.remove(&artifact_paths).await?;
        }

        self.finality.await_finality(ledger, &ctx).await;

        let bar = self.progress_bar("processing hashes");
        let read = RecordVerifier::new(self.read_concurrency)
            .verify_all(ledger, self.records.as_ref(), &ctx, &write.results, &bar)
            .instrument(info_span!("read_phase"))
            .await;
        bar.finish_and_clear();

        let mut verification = OrderingValidator::scan(&read.lookups).violations;
        verification.extend(read.hash_mismatches());

        let enforcer = TimingBudgetEnforcer::new(self.params.timeout());
        let outcome = ReportAggregator::new(ctx.started_at(), self.params.clone()).aggregate(Findings {
            write_duration: write.duration,
            read_duration: read.duration,
            submitted: write.succeeded(),
            verified: read.answered(),
            submission: write.violations(),
            write_timing: enforcer.check_write(write.duration),
            verification,
            read_timing: enforcer.check_read(read.duration),
        });

        info!(
            success = outcome.success,
            violations = outcome.violations.len(),
            write_ms = outcome.write_duration_ms,
            read_ms = outcome.read_duration_ms,
            "notarization run completed"
        );
        Ok(outcome)
    }

    fn progress_bar(&self, label: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.params.file_nb as u64);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(style);
        bar.set_message(label);
        bar
    }
}
