//! Where the read phase looks a notarization up.
//!
//! Records are either decoded from the transaction itself through the ledger
//! client or fetched from the gateway's timestamp API by content hash.

use std::fmt;

use alloy_primitives::{B256, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::trace;
use url::Url;

use super::{LedgerClient, TransactionRecord, gateway::directory};
use crate::{context::RunContext, error::LedgerError};

/// Gateway path serving timestamps by content hash.
const HASHES_PATH: &str = "timestamp/v1/hashes/";

/// Source of the record checked for each accepted submission.
#[async_trait]
pub trait RecordSource: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the record for the notarization of `hash` submitted as `handle`.
    /// `None` if the source has no answer for it.
    async fn lookup(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &RunContext,
        handle: TxHash,
        hash: B256,
    ) -> Result<Option<TransactionRecord>, LedgerError>;
}

/// Decodes the record embedded in the included transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedRecordSource;

#[async_trait]
impl RecordSource for EmbeddedRecordSource {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn lookup(
        &self,
        ledger: &dyn LedgerClient,
        ctx: &RunContext,
        handle: TxHash,
        _hash: B256,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        ledger.get_transaction_record(ctx, handle).await
    }
}

#[derive(Deserialize)]
struct HashRecord {
    #[serde(default)]
    hash: Option<String>,
    timestamp: String,
}

/// Reads timestamps from the gateway's public timestamp API.
#[derive(Debug, Clone)]
pub struct TimestampApiClient {
    http: reqwest::Client,
    hashes_url: Url,
}

impl TimestampApiClient {
    /// Creates a client for the gateway at `base`.
    pub fn new(base: &Url) -> Result<Self, LedgerError> {
        let hashes_url =
            directory(base).join(HASHES_PATH).map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self { http: reqwest::Client::new(), hashes_url })
    }

    /// URL queried for `hash`. The hash is sent as bare hex.
    pub fn url_for(&self, hash: B256) -> Result<Url, LedgerError> {
        self.hashes_url.join(&hex::encode(hash)).map_err(|e| LedgerError::Transport(e.to_string()))
    }

    /// Fetches the timestamp record of `hash`. `None` if the API does not know it.
    pub async fn fetch(&self, hash: B256) -> Result<Option<TransactionRecord>, LedgerError> {
        let url = self.url_for(hash)?;
        let response = self.http.get(url).header("Accept", "application/json").send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }

        let body: HashRecord = response.json().await?;
        trace!(%hash, timestamp = %body.timestamp, "timestamp record received");
        let timestamp = DateTime::parse_from_rfc3339(&body.timestamp)
            .map_err(|e| LedgerError::Decode(format!("invalid timestamp {:?}: {e}", body.timestamp)))?
            .with_timezone(&Utc);
        let recorded = match body.hash {
            Some(raw) => raw
                .parse::<B256>()
                .map_err(|e| LedgerError::Decode(format!("invalid hash {raw:?}: {e}")))?,
            None => hash,
        };
        Ok(Some(TransactionRecord { hash: recorded, timestamp }))
    }
}

#[async_trait]
impl RecordSource for TimestampApiClient {
    fn name(&self) -> &'static str {
        "timestamp-api"
    }

    async fn lookup(
        &self,
        _ledger: &dyn LedgerClient,
        _ctx: &RunContext,
        _handle: TxHash,
        hash: B256,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        self.fetch(hash).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    fn hash() -> B256 {
        B256::repeat_byte(0xab)
    }

    async fn api(response: ResponseTemplate) -> (MockServer, TimestampApiClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/timestamp/v1/hashes/{}", "ab".repeat(32))))
            .respond_with(response)
            .mount(&server)
            .await;
        let client = TimestampApiClient::new(&server.uri().parse().unwrap()).unwrap();
        (server, client)
    }

    #[test]
    fn hash_is_requested_without_prefix() {
        let client = TimestampApiClient::new(&"https://api.example.test/gw".parse().unwrap()).unwrap();
        assert_eq!(
            client.url_for(hash()).unwrap().as_str(),
            format!("https://api.example.test/gw/timestamp/v1/hashes/{}", "ab".repeat(32))
        );
    }

    #[tokio::test]
    async fn known_hash_yields_timestamp() {
        let (server, client) = api(ResponseTemplate::new(200).set_body_json(json!({
            "hash": format!("0x{}", "ab".repeat(32)),
            "timestamp": "2021-03-04T10:20:30.456Z",
            "blockNumber": 42,
        })))
        .await;

        let record = client.fetch(hash()).await.unwrap().unwrap();

        assert_eq!(record.hash, hash());
        assert_eq!(record.timestamp.timestamp_millis(), 1_614_853_230_456);
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn recorded_hash_is_reported_as_returned() {
        let (_server, client) = api(ResponseTemplate::new(200).set_body_json(json!({
            "hash": "ee".repeat(32),
            "timestamp": "2021-03-04T10:20:30Z",
        })))
        .await;

        let record = client.fetch(hash()).await.unwrap().unwrap();

        assert_eq!(record.hash, B256::repeat_byte(0xee));
    }

    #[tokio::test]
    async fn unknown_hash_has_no_record() {
        let (_server, client) = api(ResponseTemplate::new(404)).await;

        assert!(client.fetch(hash()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let (_server, client) = api(ResponseTemplate::new(502)).await;

        assert!(matches!(client.fetch(hash()).await, Err(LedgerError::Status(502))));
    }

    #[tokio::test]
    async fn unparsable_timestamp_is_a_decode_error() {
        let (_server, client) =
            api(ResponseTemplate::new(200).set_body_json(json!({ "timestamp": "yesterday" }))).await;

        assert!(matches!(client.fetch(hash()).await, Err(LedgerError::Decode(_))));
    }
}
