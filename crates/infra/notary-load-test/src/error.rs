//! Error types for the notarization harness.
//!
//! Only session-level and local filesystem faults abort a run. Everything that
//! happens while talking to the ledger is degraded into a recorded finding.

use std::{io, path::PathBuf};

use alloy_transport::{RpcError, TransportError, TransportErrorKind};
use thiserror::Error;

/// Errors returned by the ledger boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The gateway answered with a non-success HTTP status.
    #[error("unexpected http status {0}")]
    Status(u16),
    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { Self::Decode(err.to_string()) } else { Self::Transport(err.to_string()) }
    }
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                Self::Rpc { code: payload.code, message: payload.message.into_owned() }
            }
            RpcError::Transport(TransportErrorKind::HttpError(http)) => Self::Status(http.status),
            RpcError::NullResp => Self::Decode("empty rpc response".into()),
            err @ (RpcError::DeserError { .. } | RpcError::SerError(_)) => {
                Self::Decode(err.to_string())
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Failure to obtain a session token. Always fatal to the run.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session endpoint could not be reached.
    #[error("session endpoint unreachable: {0}")]
    Unreachable(String),
    /// The session endpoint rejected the request.
    #[error("session request rejected with status {0}")]
    Rejected(u16),
    /// The session endpoint answered with a body that is not a session response.
    #[error("invalid session response: {0}")]
    InvalidResponse(String),
    /// The response did not contain an access token.
    #[error("session response did not contain an access token")]
    MissingToken,
}

/// Per-transaction failure. Recorded on the submission result, never raised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The sender's nonce could not be fetched.
    #[error("nonce fetch failed: {0}")]
    NonceFetch(String),
    /// The transaction could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),
    /// The ledger rejected the transaction or the transport failed.
    #[error("submission failed: {0}")]
    Rejected(String),
}

/// Failure to load identities from a secret source.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret source could not be read.
    #[error("failed to read secrets from {path}: {source}")]
    Io {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The secret source was not valid JSON.
    #[error("failed to parse wallets file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A private key could not be parsed.
    #[error("invalid private key at position {index}")]
    InvalidKey {
        /// Position of the key in the source.
        index: usize,
    },
    /// The environment variable holding the keys is not set.
    #[error("environment variable {0} is not set")]
    MissingVar(String),
    /// The source contained no identities.
    #[error("no identities found")]
    Empty,
}

/// Local filesystem failure while persisting or cleaning up payload artifacts.
#[derive(Debug, Error)]
#[error("artifact io failed for {}: {source}", path.display())]
pub struct ArtifactIoError {
    /// Path of the artifact being written or removed.
    pub path: PathBuf,
    /// Underlying error.
    #[source]
    pub source: io::Error,
}

/// Fatal errors that abort a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Login failed before any submission happened.
    #[error("session login failed: {0}")]
    Session(#[from] SessionError),
    /// The chain id could not be read, so nothing can be signed.
    #[error("failed to read chain id: {0}")]
    ChainId(#[source] LedgerError),
    /// Payload artifacts could not be written or removed.
    #[error(transparent)]
    ArtifactIo(#[from] ArtifactIoError),
    /// The run configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}
