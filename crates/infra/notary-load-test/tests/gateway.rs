//! Runs against a live gateway. Skipped unless `NOTARY_INTEGRATION_TESTS` is set.

use std::time::Duration;

use notary_load_test::{
    EnvKeysProvider, GatewayClient, HarnessRunner, IdentityPool, LedgerClient, NonceSequencing,
    ReceiptPollingFinalityPolicy, SecretProvider, SessionToken, StaticTokenAuthenticator,
    TestParams,
};
use url::Url;

fn gateway_url() -> Url {
    let raw = std::env::var("NOTARY_API_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    Url::parse(&raw).unwrap()
}

fn enabled() -> bool {
    if std::env::var("NOTARY_INTEGRATION_TESTS").is_err() {
        eprintln!(
            "Skipping gateway tests (set NOTARY_INTEGRATION_TESTS=1, NOTARY_API_URL, \
             NOTARY_SESSION_TOKEN and NOTARY_IDENTITY_KEYS)"
        );
        return false;
    }
    true
}

#[tokio::test]
async fn gateway_reports_chain_id() {
    if !enabled() {
        return;
    }
    let client = GatewayClient::new(&gateway_url()).unwrap();
    let chain_id = client.chain_id().await.unwrap();
    assert!(chain_id > 0);
}

#[tokio::test]
async fn small_run_against_gateway() {
    if !enabled() {
        return;
    }
    let token = std::env::var("NOTARY_SESSION_TOKEN").unwrap();
    let identities = EnvKeysProvider::new(EnvKeysProvider::DEFAULT_VAR).load().unwrap();
    let pool = IdentityPool::new(identities, NonceSequencing::Authority).unwrap();
    let client = GatewayClient::new(&gateway_url()).unwrap();

    let outcome = HarnessRunner::new(
        TestParams::default().with_file_nb(3).with_size_range(10, 20),
        pool,
    )
    .with_finality(ReceiptPollingFinalityPolicy::new(
        Duration::from_secs(1),
        Duration::from_secs(60),
    ))
    .run(&client, &StaticTokenAuthenticator::new(SessionToken::new(token)))
    .await
    .unwrap();

    assert!(outcome.success, "violations: {:?}", outcome.violations);
}
