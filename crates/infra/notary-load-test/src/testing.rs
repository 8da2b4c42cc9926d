//! In-memory ledger and authenticators for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use alloy_consensus::{Transaction, TxEnvelope, transaction::SignerRecoverable};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Address, B256, Bytes, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    codec::NotarizationPayload,
    context::{RunContext, SessionToken},
    error::{LedgerError, SessionError},
    ledger::{LedgerClient, SessionAuthenticator, TransactionRecord},
};

#[derive(Debug, Default)]
struct State {
    nonces: HashMap<Address, u64>,
    records: HashMap<TxHash, NotarizationPayload>,
    rejected_payloads: HashSet<B256>,
    hidden_records: HashSet<B256>,
    failing_lookups: HashSet<B256>,
    failing_nonces: HashSet<Address>,
    timestamp_overrides: HashMap<B256, DateTime<Utc>>,
    hash_overrides: HashMap<B256, B256>,
    outstanding: HashMap<Address, usize>,
    max_outstanding_per_sender: usize,
    in_flight: usize,
    max_in_flight: usize,
    nonce_queries: usize,
    record_queries: usize,
}

/// Ledger that keeps accepted transactions in memory.
///
/// Transactions are accepted only if their nonce equals the sender's current
/// nonce at the moment submission completes, so overlapping submissions from the
/// same sender are rejected like on a real node.
#[derive(Debug)]
pub struct MockLedger {
    chain_id: u64,
    latency: Duration,
    fail_chain_id: bool,
    state: Mutex<State>,
}

impl MockLedger {
    /// Creates an empty ledger.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, latency: Duration::ZERO, fail_chain_id: false, state: Mutex::default() }
    }

    /// Delays every call by `latency`.
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes `chain_id` fail.
    pub const fn with_unreachable_chain_id(mut self) -> Self {
        self.fail_chain_id = true;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn delay(&self) {
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Sets the current nonce of `address`.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state().nonces.insert(address, nonce);
    }

    /// Current nonce of `address`.
    pub fn nonce_of(&self, address: Address) -> u64 {
        self.state().nonces.get(&address).copied().unwrap_or_default()
    }

    /// Rejects transactions notarizing `hash`.
    pub fn reject_payload(&self, hash: B256) {
        self.state().rejected_payloads.insert(hash);
    }

    /// Makes nonce lookups for `address` fail.
    pub fn fail_nonce_for(&self, address: Address) {
        self.state().failing_nonces.insert(address);
    }

    /// Makes the record notarizing `hash` unknown to lookups.
    pub fn hide_record(&self, hash: B256) {
        self.state().hidden_records.insert(hash);
    }

    /// Makes lookups of the record notarizing `hash` fail.
    pub fn fail_record_lookup(&self, hash: B256) {
        self.state().failing_lookups.insert(hash);
    }

    /// Reports `timestamp` for the record notarizing `hash`.
    pub fn override_timestamp(&self, hash: B256, timestamp: DateTime<Utc>) {
        self.state().timestamp_overrides.insert(hash, timestamp);
    }

    /// Reports `observed` instead of `hash` for the record notarizing `hash`.
    pub fn override_hash(&self, hash: B256, observed: B256) {
        self.state().hash_overrides.insert(hash, observed);
    }

    /// Highest number of concurrent submissions seen from a single sender.
    pub fn max_outstanding_per_sender(&self) -> usize {
        self.state().max_outstanding_per_sender
    }

    /// Highest number of concurrent submissions seen overall.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    /// Number of nonce lookups served.
    pub fn nonce_queries(&self) -> usize {
        self.state().nonce_queries
    }

    /// Number of record lookups served.
    pub fn record_queries(&self) -> usize {
        self.state().record_queries
    }

    /// Number of accepted transactions.
    pub fn accepted(&self) -> usize {
        self.state().records.len()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        if self.fail_chain_id {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self.chain_id)
    }

    async fn get_nonce(&self, _ctx: &RunContext, address: Address) -> Result<u64, LedgerError> {
        self.delay().await;
        let mut state = self.state();
        state.nonce_queries += 1;
        if state.failing_nonces.contains(&address) {
            return Err(LedgerError::Transport("nonce lookup failed".into()));
        }
        Ok(state.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn submit_transaction(
        &self,
        _ctx: &RunContext,
        raw: Bytes,
    ) -> Result<TxHash, LedgerError> {
        let envelope = TxEnvelope::decode_2718_exact(&raw)
            .map_err(|e| LedgerError::Decode(e.to_string()))?;
        let sender = envelope.recover_signer().map_err(|e| LedgerError::Decode(e.to_string()))?;
        let payload = NotarizationPayload::decode_input(envelope.input())
            .ok_or_else(|| LedgerError::Decode("not a notarization".into()))?;

        {
            let mut state = self.state();
            let outstanding = state.outstanding.entry(sender).or_default();
            *outstanding += 1;
            let outstanding = *outstanding;
            state.max_outstanding_per_sender = state.max_outstanding_per_sender.max(outstanding);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        self.delay().await;

        let mut state = self.state();
        state.in_flight -= 1;
        if let Some(outstanding) = state.outstanding.get_mut(&sender) {
            *outstanding -= 1;
        }

        if state.rejected_payloads.contains(&payload.hash) {
            return Err(LedgerError::Rpc { code: -32000, message: "transaction rejected".into() });
        }
        let expected = state.nonces.get(&sender).copied().unwrap_or_default();
        if envelope.nonce() != expected {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("invalid nonce {}, expected {expected}", envelope.nonce()),
            });
        }
        state.nonces.insert(sender, expected + 1);

        let handle = *envelope.tx_hash();
        state.records.insert(handle, payload);
        Ok(handle)
    }

    async fn get_transaction_record(
        &self,
        _ctx: &RunContext,
        handle: TxHash,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        self.delay().await;
        let mut state = self.state();
        state.record_queries += 1;

        let Some(payload) = state.records.get(&handle).copied() else {
            return Ok(None);
        };
        if state.failing_lookups.contains(&payload.hash) {
            return Err(LedgerError::Status(503));
        }
        if state.hidden_records.contains(&payload.hash) {
            return Ok(None);
        }
        Ok(Some(TransactionRecord {
            hash: state.hash_overrides.get(&payload.hash).copied().unwrap_or(payload.hash),
            timestamp: state
                .timestamp_overrides
                .get(&payload.hash)
                .copied()
                .unwrap_or_else(|| payload.timestamp()),
        }))
    }
}

/// Authenticator whose login always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingAuthenticator;

#[async_trait]
impl SessionAuthenticator for RejectingAuthenticator {
    async fn login(&self) -> Result<SessionToken, SessionError> {
        Err(SessionError::Rejected(401))
    }
}
