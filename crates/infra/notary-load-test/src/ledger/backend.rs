//! Interchangeable strategies for turning a notarization request into a signed transaction.

use std::fmt;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, Bytes, TxHash, TxKind, U256};
use alloy_signer::SignerSync;
use chrono::{DateTime, Utc};

use crate::{codec::NotarizationPayload, error::SubmissionError, identity::Identity};

/// Gas limit of a notarization transaction.
const NOTARIZATION_GAS_LIMIT: u64 = 221_000;

/// Everything needed to build one notarization transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRequest<'a> {
    /// Signing identity.
    pub sender: &'a Identity,
    /// Receiving identity (the next identity in the pool).
    pub receiver: &'a Identity,
    /// Content hash being notarized.
    pub payload_hash: B256,
    /// Sender nonce.
    pub nonce: u64,
    /// Timestamp embedded next to the hash.
    pub embedded_timestamp: DateTime<Utc>,
}

impl TransactionRequest<'_> {
    /// The payload carried by the transaction.
    pub fn payload(&self) -> NotarizationPayload {
        NotarizationPayload::new(self.embedded_timestamp, self.payload_hash)
    }
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedNotarization {
    /// Locally computed transaction hash.
    pub handle: TxHash,
    /// EIP-2718 encoded transaction.
    pub raw: Bytes,
}

/// Strategy for building and signing notarization transactions.
pub trait LedgerBackend: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Builds and signs the transaction for `request`.
    fn build(
        &self,
        request: &TransactionRequest<'_>,
        chain_id: u64,
    ) -> Result<SignedNotarization, SubmissionError>;
}

/// Sends the raw payload from the sender identity to the receiver identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataTransferBackend;

impl LedgerBackend for DataTransferBackend {
    fn name(&self) -> &'static str {
        "data-transfer"
    }

    fn build(
        &self,
        request: &TransactionRequest<'_>,
        chain_id: u64,
    ) -> Result<SignedNotarization, SubmissionError> {
        sign_legacy(request, chain_id, request.receiver.address(), request.payload().encode())
    }
}

/// Calls `addRecord(bytes)` on the notary contract.
#[derive(Debug, Clone, Copy)]
pub struct NotaryContractBackend {
    contract: Address,
}

impl NotaryContractBackend {
    /// Creates a backend targeting the given notary contract.
    pub const fn new(contract: Address) -> Self {
        Self { contract }
    }
}

impl LedgerBackend for NotaryContractBackend {
    fn name(&self) -> &'static str {
        "notary-contract"
    }

    fn build(
        &self,
        request: &TransactionRequest<'_>,
        chain_id: u64,
    ) -> Result<SignedNotarization, SubmissionError> {
        sign_legacy(request, chain_id, self.contract, request.payload().encode_contract_call())
    }
}

// The ledger charges no gas: transactions are zero-priced legacy ones.
fn sign_legacy(
    request: &TransactionRequest<'_>,
    chain_id: u64,
    to: Address,
    input: Bytes,
) -> Result<SignedNotarization, SubmissionError> {
    let tx = TxLegacy {
        chain_id: Some(chain_id),
        nonce: request.nonce,
        gas_price: 0,
        gas_limit: NOTARIZATION_GAS_LIMIT,
        to: TxKind::Call(to),
        value: U256::ZERO,
        input,
    };

    let signature = request
        .sender
        .signer()
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| SubmissionError::Signing(e.to_string()))?;
    let signed = tx.into_signed(signature);
    let handle = *signed.hash();
    let raw: Bytes = TxEnvelope::Legacy(signed).encoded_2718().into();

    Ok(SignedNotarization { handle, raw })
}

#[cfg(test)]
mod tests {
    use alloy_consensus::{Transaction, transaction::SignerRecoverable};
    use alloy_eips::eip2718::Decodable2718;

    use super::*;
    use crate::secrets::{GeneratedIdentities, SecretProvider};

    fn identities() -> Vec<Identity> {
        GeneratedIdentities::new(2).with_seed(7).load().unwrap()
    }

    fn request<'a>(ids: &'a [Identity]) -> TransactionRequest<'a> {
        TransactionRequest {
            sender: &ids[0],
            receiver: &ids[1],
            payload_hash: B256::repeat_byte(0x11),
            nonce: 5,
            embedded_timestamp: DateTime::from_timestamp_millis(1_000).unwrap(),
        }
    }

    #[test]
    fn data_transfer_targets_receiver() {
        let ids = identities();
        let req = request(&ids);
        let signed = DataTransferBackend.build(&req, 1337).unwrap();

        let envelope = TxEnvelope::decode_2718_exact(&signed.raw).unwrap();
        assert_eq!(*envelope.tx_hash(), signed.handle);
        assert_eq!(envelope.to(), Some(ids[1].address()));
        assert_eq!(envelope.nonce(), 5);
        assert_eq!(envelope.chain_id(), Some(1337));
        assert_eq!(envelope.recover_signer().unwrap(), ids[0].address());
        assert_eq!(NotarizationPayload::decode_input(envelope.input()), Some(req.payload()));
    }

    #[test]
    fn contract_backend_wraps_payload_in_call() {
        let ids = identities();
        let req = request(&ids);
        let contract = Address::repeat_byte(0x21);
        let signed = NotaryContractBackend::new(contract).build(&req, 1337).unwrap();

        let envelope = TxEnvelope::decode_2718_exact(&signed.raw).unwrap();
        assert_eq!(envelope.to(), Some(contract));
        assert_ne!(envelope.input().as_ref(), req.payload().encode().as_ref());
        assert_eq!(NotarizationPayload::decode_input(envelope.input()), Some(req.payload()));
    }
}
