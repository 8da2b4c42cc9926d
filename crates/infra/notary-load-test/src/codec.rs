//! Encoding of the notarization payload carried by each transaction.
//!
//! The payload is the submission timestamp (milliseconds since the Unix epoch,
//! big-endian) followed by the 32-byte content hash. It is either carried as raw
//! transaction input or wrapped in a call to the notary contract's `addRecord`.

use alloy_primitives::{B256, Bytes};
use alloy_sol_types::{SolCall, sol};
use chrono::{DateTime, Utc};

sol! {
    interface Notary {
        function addRecord(bytes record) external;
    }
}

/// Length of an encoded payload.
pub const PAYLOAD_LEN: usize = 8 + 32;

/// Hash and timestamp embedded in a notarization transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotarizationPayload {
    /// Milliseconds since the Unix epoch at which the transaction was built.
    pub timestamp_ms: u64,
    /// Content hash being notarized.
    pub hash: B256,
}

impl NotarizationPayload {
    /// Creates a payload stamped with the given time.
    pub fn new(timestamp: DateTime<Utc>, hash: B256) -> Self {
        Self { timestamp_ms: timestamp.timestamp_millis().max(0) as u64, hash }
    }

    /// Embedded timestamp as a UTC date.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms as i64).unwrap_or_default()
    }

    /// Encodes to `timestamp || hash`.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(PAYLOAD_LEN);
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        out.extend_from_slice(self.hash.as_slice());
        out.into()
    }

    /// Encodes as calldata for `Notary.addRecord`.
    pub fn encode_contract_call(&self) -> Bytes {
        Notary::addRecordCall { record: self.encode() }.abi_encode().into()
    }

    /// Decodes a raw `timestamp || hash` payload.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() != PAYLOAD_LEN {
            return None;
        }
        let (ts, hash) = raw.split_at(8);
        let timestamp_ms = u64::from_be_bytes(ts.try_into().ok()?);
        Some(Self { timestamp_ms, hash: B256::from_slice(hash) })
    }

    /// Decodes transaction input in either supported form.
    pub fn decode_input(input: &[u8]) -> Option<Self> {
        if input.starts_with(&Notary::addRecordCall::SELECTOR) {
            let call = Notary::addRecordCall::abi_decode(input).ok()?;
            return Self::decode(&call.record);
        }
        Self::decode(input)
    }
}
