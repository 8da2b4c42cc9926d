//! Session token acquisition.
//!
//! Producing the signed session request is an external concern; this module only
//! exchanges an already built request for an access token.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::gateway::directory;
use crate::{context::SessionToken, error::SessionError};

const SESSIONS_PATH: &str = "ledger/v1/sessions";

/// Obtains the session token used by every authenticated ledger call.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// Logs in. A failure aborts the run.
    async fn login(&self) -> Result<SessionToken, SessionError>;
}

/// Uses a token issued out of band.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    token: SessionToken,
}

impl StaticTokenAuthenticator {
    /// Wraps an existing token.
    pub const fn new(token: SessionToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl SessionAuthenticator for StaticTokenAuthenticator {
    async fn login(&self) -> Result<SessionToken, SessionError> {
        Ok(self.token.clone())
    }
}

/// Posts a pre-built session request to the gateway's session endpoint.
#[derive(Debug, Clone)]
pub struct SessionEndpointAuthenticator {
    http: reqwest::Client,
    url: Url,
    request: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_token: Option<String>,
}

impl SessionEndpointAuthenticator {
    /// Creates an authenticator for the gateway at `base`.
    pub fn new(base: &Url, request: serde_json::Value) -> Result<Self, SessionError> {
        let url = directory(base)
            .join(SESSIONS_PATH)
            .map_err(|e| SessionError::Unreachable(e.to_string()))?;
        Ok(Self { http: reqwest::Client::new(), url, request })
    }

    /// Full URL of the session endpoint.
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SessionAuthenticator for SessionEndpointAuthenticator {
    async fn login(&self) -> Result<SessionToken, SessionError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&self.request)
            .send()
            .await
            .map_err(|e| SessionError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Rejected(status.as_u16()));
        }

        let body: SessionResponse =
            response.json().await.map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        let token = body.access_token.filter(|t| !t.is_empty()).ok_or(SessionError::MissingToken)?;
        info!(endpoint = %self.url, "session established");
        Ok(SessionToken::new(token))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    use super::*;

    async fn endpoint(response: ResponseTemplate) -> (MockServer, SessionEndpointAuthenticator) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ledger/v1/sessions"))
            .and(body_json(json!({ "id_token": "signed" })))
            .respond_with(response)
            .mount(&server)
            .await;
        let auth = SessionEndpointAuthenticator::new(
            &server.uri().parse().unwrap(),
            json!({ "id_token": "signed" }),
        )
        .unwrap();
        (server, auth)
    }

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let auth = StaticTokenAuthenticator::new(SessionToken::new("abc"));
        assert_eq!(auth.login().await.unwrap().as_str(), "abc");
    }

    #[test]
    fn session_url_is_joined_under_base() {
        let auth = SessionEndpointAuthenticator::new(
            &"https://api.example.test".parse().unwrap(),
            serde_json::json!({}),
        )
        .unwrap();
        assert_eq!(auth.url().as_str(), "https://api.example.test/ledger/v1/sessions");
    }

    #[tokio::test]
    async fn access_token_is_exchanged() {
        let (_server, auth) = endpoint(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "abc", "tokenType": "Bearer" })),
        )
        .await;

        assert_eq!(auth.login().await.unwrap().as_str(), "abc");
    }

    #[tokio::test]
    async fn rejected_request_reports_status() {
        let (_server, auth) = endpoint(ResponseTemplate::new(403)).await;

        assert!(matches!(auth.login().await, Err(SessionError::Rejected(403))));
    }

    #[tokio::test]
    async fn missing_access_token_is_reported() {
        let (_server, auth) =
            endpoint(ResponseTemplate::new(200).set_body_json(json!({ "tokenType": "Bearer" })))
                .await;

        assert!(matches!(auth.login().await, Err(SessionError::MissingToken)));
    }

    #[tokio::test]
    async fn malformed_body_keeps_decode_cause() {
        let (_server, auth) =
            endpoint(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>")).await;

        let err = auth.login().await.unwrap_err();

        let SessionError::InvalidResponse(cause) = &err else { panic!("unexpected error {err:?}") };
        assert!(!cause.is_empty());
        assert!(err.to_string().starts_with("invalid session response"));
    }
}
