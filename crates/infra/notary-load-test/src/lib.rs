#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

/// On-disk copies of generated payloads.
pub mod artifacts;
/// Wire format of notarization payloads.
pub mod codec;
/// Run parameters and environment presets.
pub mod config;
/// Per-run state shared by every ledger call.
pub mod context;
/// Error types.
pub mod error;
/// Waiting for submitted transactions to settle.
pub mod finality;
/// Signing identities and nonce sequencing.
pub mod identity;
/// Ledger boundary: client trait, gateway, sessions and transaction backends.
pub mod ledger;
/// Timestamp monotonicity checks.
pub mod ordering;
/// Report rendering.
pub mod output;
/// Outcome aggregation.
pub mod report;
/// Pipeline orchestration.
pub mod runner;
/// Loading and generating identity keys.
pub mod secrets;
/// Write phase.
pub mod submitter;
/// Phase budget checks.
pub mod timing;
/// Read phase.
pub mod verifier;
/// Findings that fail a run.
pub mod violation;
/// Random payload generation.
pub mod workload;

/// In-memory ledger for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use artifacts::ArtifactStore;
pub use config::{DEFAULT_FINALITY_DELAY, Environment, MAX_PAYLOAD_KB, TestParams};
pub use context::{RunContext, SessionToken};
pub use error::{
    ArtifactIoError, HarnessError, LedgerError, SecretError, SessionError, SubmissionError,
};
pub use finality::{FinalityPolicy, FixedDelayFinalityPolicy, ReceiptPollingFinalityPolicy};
pub use identity::{Identity, IdentityPool, NonceSequencing};
pub use ledger::{
    DataTransferBackend, EmbeddedRecordSource, GatewayClient, LedgerBackend, LedgerClient,
    NotaryContractBackend, RecordSource, SessionAuthenticator, SessionEndpointAuthenticator,
    StaticTokenAuthenticator, TimestampApiClient, TransactionRecord,
};
pub use output::{ReportFormat, display_timing, render_json, render_text, save_report};
pub use report::{ReportAggregator, TestOutcome};
pub use runner::HarnessRunner;
pub use secrets::{
    EnvKeysProvider, GeneratedIdentities, SecretProvider, WalletsFileProvider, save_wallets,
};
pub use violation::Violation;
pub use workload::{Payload, WorkloadGenerator};
