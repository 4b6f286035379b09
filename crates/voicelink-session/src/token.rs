//! Session credential acquisition.
//!
//! The backend issues a short-lived room credential in exchange for the
//! caller's bearer token:
//!
//! ```text
//! POST {server_url}
//! Authorization: Bearer {client_token}
//! {"agentId": "...", "sessionId": "...", "uiAccessToken": "..."}
//!
//! 200 {"token": "..."}
//! ```
//!
//! `uiAccessToken` is omitted when absent or empty. Anything other than a
//! 2xx response carrying a non-empty string `token` is an error.

use crate::error::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use voicelink_types::{ConnectParams, SessionCredential};

/// Default timeout for a token request.
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest error body kept in [`SessionError::TokenStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Anything that can exchange connection parameters for a room credential.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self, params: &ConnectParams) -> Result<SessionCredential, SessionError>;
}

/// JSON body of the token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest<'a> {
    pub agent_id: &'a str,
    pub session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_access_token: Option<&'a str>,
}

impl<'a> From<&'a ConnectParams> for TokenRequest<'a> {
    fn from(params: &'a ConnectParams) -> Self {
        Self {
            agent_id: &params.agent_id,
            session_id: &params.session_id,
            ui_access_token: params.ui_access_token(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// HTTP token client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
}

impl TokenClient {
    /// Builds a client with [`DEFAULT_TOKEN_TIMEOUT`].
    pub fn new() -> Result<Self, SessionError> {
        Self::with_timeout(DEFAULT_TOKEN_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Wraps an existing `reqwest` client (shared connection pool, custom TLS, ...).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TokenSource for TokenClient {
    async fn fetch_token(&self, params: &ConnectParams) -> Result<SessionCredential, SessionError> {
        let body = TokenRequest::from(params);
        debug!(
            url = %params.server_url,
            agent_id = body.agent_id,
            session_id = body.session_id,
            ui_access_token = body.ui_access_token.is_some(),
            "requesting session credential"
        );

        let response = self
            .http
            .post(&params.server_url)
            .bearer_auth(&params.client_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::TokenStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::TokenResponse(e.to_string()))?;
        if parsed.token.is_empty() {
            return Err(SessionError::TokenResponse("token is empty".to_string()));
        }

        debug!(token_len = parsed.token.len(), "received session credential");
        Ok(SessionCredential::new(parsed.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> ConnectParams {
        ConnectParams::new("http://localhost/token", "ws://localhost:7880", "ct", "a1", "s1")
    }

    #[test]
    fn request_body_omits_absent_ui_access_token() {
        let p = params();
        let body = serde_json::to_value(TokenRequest::from(&p)).unwrap();
        assert_eq!(body, json!({"agentId": "a1", "sessionId": "s1"}));
    }

    #[test]
    fn request_body_omits_empty_ui_access_token() {
        let p = params().with_ui_access_token("");
        let body = serde_json::to_value(TokenRequest::from(&p)).unwrap();
        assert_eq!(body, json!({"agentId": "a1", "sessionId": "s1"}));
    }

    #[test]
    fn request_body_includes_ui_access_token() {
        let p = params().with_ui_access_token("abc");
        let body = serde_json::to_value(TokenRequest::from(&p)).unwrap();
        assert_eq!(
            body,
            json!({"agentId": "a1", "sessionId": "s1", "uiAccessToken": "abc"})
        );
    }
}
