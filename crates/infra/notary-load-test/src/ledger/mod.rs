//! Ledger boundary: the RPC client, record sources, transaction building backends
//! and session login.

use alloy_primitives::{Address, B256, Bytes, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{context::RunContext, error::LedgerError};

mod backend;
pub use backend::{
    DataTransferBackend, LedgerBackend, NotaryContractBackend, SignedNotarization,
    TransactionRequest,
};

mod gateway;
pub use gateway::GatewayClient;

mod records;
pub use records::{EmbeddedRecordSource, RecordSource, TimestampApiClient};

mod session;
pub use session::{SessionAuthenticator, SessionEndpointAuthenticator, StaticTokenAuthenticator};

/// Hash and timestamp the ledger holds for one notarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Notarized hash.
    pub hash: B256,
    /// Timestamp attached to the notarization.
    pub timestamp: DateTime<Utc>,
}

/// Calls the harness makes against the ledger.
///
/// Every call after login receives the [`RunContext`] so implementations can
/// authenticate without holding session state of their own.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Returns the chain id. Called before login.
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Returns the next nonce for `address`.
    async fn get_nonce(&self, ctx: &RunContext, address: Address) -> Result<u64, LedgerError>;

    /// Submits a signed raw transaction and returns its handle.
    async fn submit_transaction(&self, ctx: &RunContext, raw: Bytes)
    -> Result<TxHash, LedgerError>;

    /// Looks up the record of an included transaction. `None` if it is unknown or
    /// not yet included.
    async fn get_transaction_record(
        &self,
        ctx: &RunContext,
        handle: TxHash,
    ) -> Result<Option<TransactionRecord>, LedgerError>;
}
