//! Per-run state shared read-only by every component.

use std::fmt;

use alloy_primitives::TxHash;
use chrono::{DateTime, Utc};

/// Bearer token issued by the session endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// State created once at the start of a run and threaded through every ledger call.
#[derive(Debug, Clone)]
pub struct RunContext {
    chain_id: u64,
    session: SessionToken,
    started_at: DateTime<Utc>,
    handles: Vec<TxHash>,
}

impl RunContext {
    /// Creates a context for a run that started now.
    pub fn new(chain_id: u64, session: SessionToken) -> Self {
        Self { chain_id, session, started_at: Utc::now(), handles: Vec::new() }
    }

    /// Chain id used when signing.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Session token for authenticated gateway calls.
    pub const fn session(&self) -> &SessionToken {
        &self.session
    }

    /// Wall-clock time the run started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Handles of every transaction accepted so far, in submission order.
    pub fn handles(&self) -> &[TxHash] {
        &self.handles
    }

    /// Appends the handles accepted by one submission batch.
    pub fn record_handles(&mut self, handles: impl IntoIterator<Item = TxHash>) {
        self.handles.extend(handles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_is_redacted_in_debug() {
        let token = SessionToken::new("secret-access-token");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.as_str(), "secret-access-token");
    }

    #[test]
    fn handles_are_append_only() {
        let mut ctx = RunContext::new(1337, SessionToken::new("t"));
        ctx.record_handles([TxHash::repeat_byte(1)]);
        ctx.record_handles([TxHash::repeat_byte(2), TxHash::repeat_byte(3)]);
        assert_eq!(
            ctx.handles(),
            &[TxHash::repeat_byte(1), TxHash::repeat_byte(2), TxHash::repeat_byte(3)]
        );
    }
}
