//! JSON-RPC client that reaches the ledger through the API gateway.

use std::sync::Mutex;

use alloy_consensus::Transaction as _;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_transport_http::Http;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::trace;
use url::Url;

use super::{LedgerClient, TransactionRecord};
use crate::{
    codec::NotarizationPayload,
    context::{RunContext, SessionToken},
    error::LedgerError,
};

/// Gateway path proxying JSON-RPC to the ledger nodes.
const RPC_PATH: &str = "ledger/v1/blockchains/besu";

/// [`LedgerClient`] over the gateway's JSON-RPC endpoint.
///
/// `eth_chainId` is served without credentials. Every other call carries the
/// session token as a bearer header; the authenticated provider is built on first
/// use and rebuilt only when the token changes.
#[derive(Debug)]
pub struct GatewayClient {
    rpc_url: Url,
    public: RootProvider,
    authenticated: Mutex<Option<(SessionToken, RootProvider)>>,
}

impl GatewayClient {
    /// Creates a client for the gateway at `base`.
    pub fn new(base: &Url) -> Result<Self, LedgerError> {
        let rpc_url =
            directory(base).join(RPC_PATH).map_err(|e| LedgerError::Transport(e.to_string()))?;
        let public = rpc_provider(reqwest::Client::new(), rpc_url.clone());
        Ok(Self { rpc_url, public, authenticated: Mutex::new(None) })
    }

    /// Full URL of the JSON-RPC endpoint.
    pub const fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    fn provider_for(&self, session: &SessionToken) -> Result<RootProvider, LedgerError> {
        let mut cached = self.authenticated.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((token, provider)) = cached.as_ref()
            && token == session
        {
            return Ok(provider.clone());
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", session.as_str()))
            .map_err(|e| LedgerError::Transport(format!("invalid session token: {e}")))?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let provider = rpc_provider(http, self.rpc_url.clone());
        *cached = Some((session.clone(), provider.clone()));
        Ok(provider)
    }
}

fn rpc_provider(http: reqwest::Client, url: Url) -> RootProvider {
    let transport = Http::with_client(http, url);
    RootProvider::new(RpcClient::new(transport, false))
}

#[async_trait]
impl LedgerClient for GatewayClient {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.public.get_chain_id().await?)
    }

    async fn get_nonce(&self, ctx: &RunContext, address: Address) -> Result<u64, LedgerError> {
        let provider = self.provider_for(ctx.session())?;
        Ok(provider.get_transaction_count(address).pending().await?)
    }

    async fn submit_transaction(
        &self,
        ctx: &RunContext,
        raw: Bytes,
    ) -> Result<TxHash, LedgerError> {
        let provider = self.provider_for(ctx.session())?;
        let pending = provider.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn get_transaction_record(
        &self,
        ctx: &RunContext,
        handle: TxHash,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let provider = self.provider_for(ctx.session())?;
        let tx = provider.get_transaction_by_hash(handle).await?;
        let Some(tx) = tx.filter(|tx| tx.block_number.is_some()) else {
            trace!(%handle, "transaction not included yet");
            return Ok(None);
        };
        let payload = NotarizationPayload::decode_input(tx.input()).ok_or_else(|| {
            LedgerError::Decode(format!("transaction {handle} does not carry a notarization"))
        })?;
        Ok(Some(TransactionRecord { hash: payload.hash, timestamp: payload.timestamp() }))
    }
}

/// Ensures `base` is treated as a directory when joining relative paths.
pub(crate) fn directory(base: &Url) -> Url {
    let mut url = base.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
