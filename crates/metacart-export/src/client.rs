//! Authenticated IDMC catalog client
//!
//! Hostname layout: the identity service lives at
//! `https://{pod}.informaticacloud.com`, the catalog API at
//! `https://idmc-api.{pod}.informaticacloud.com`. The pod is a tenant
//! specific regional deployment identifier from the config file.

use crate::error::ExportError;
use serde::Deserialize;
use std::time::Duration;

/// OAuth-style client identifier expected by the token endpoint
pub const CLIENT_ID: &str = "idmc_api";

/// Fixed nonce accepted by the token endpoint
pub const NONCE: &str = "1234";

/// A logged-in identity session
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier
    pub session_id: String,

    /// Organization the credentials resolved to
    pub org_id: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,

    #[serde(rename = "currentOrgId")]
    current_org_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    jwt_token: Option<String>,
}

/// HTTP client bound to one pod
pub struct IdmcClient {
    pub(crate) http: reqwest::Client,
    pub(crate) pod: String,
}

/// Identity service base URL for a pod
pub(crate) fn identity_base(pod: &str) -> String {
    format!("https://{}.informaticacloud.com", pod)
}

/// Catalog API base URL for a pod
pub(crate) fn api_base(pod: &str) -> String {
    format!("https://idmc-api.{}.informaticacloud.com", pod)
}

impl IdmcClient {
    /// Create a client for the given pod
    pub fn new(pod: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            pod: pod.into(),
        }
    }

    /// Exchange username/password for a session.
    ///
    /// Fails with [`ExportError::Auth`] on a non-success status or when the
    /// response lacks `sessionId`/`currentOrgId`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ExportError> {
        let url = format!("{}/identity-service/api/v1/Login", identity_base(&self.pod));

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| ExportError::Auth(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth(format!(
                "login returned status {}: {}",
                status, body
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ExportError::Auth(format!("failed to parse login response: {}", e)))?;

        match (body.session_id, body.current_org_id) {
            (Some(session_id), Some(org_id)) => {
                tracing::info!(org_id = %org_id, "logged in");
                Ok(Session { session_id, org_id })
            }
            _ => Err(ExportError::Auth(
                "login response missing sessionId or currentOrgId".to_string(),
            )),
        }
    }

    /// Exchange a session for a bearer token.
    ///
    /// The token endpoint authenticates through the session cookie and the
    /// `IDS-SESSION-ID` header rather than a request body.
    pub async fn mint_token(&self, session: &Session) -> Result<String, ExportError> {
        let url = format!(
            "{}/identity-service/api/v1/jwt/Token?client_id={}&nonce={}",
            identity_base(&self.pod),
            CLIENT_ID,
            NONCE
        );

        let response = self
            .http
            .post(&url)
            .header("cookie", format!("USER_SESSION={}", session.session_id))
            .header("IDS-SESSION-ID", &session.session_id)
            .send()
            .await
            .map_err(|e| ExportError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth(format!(
                "token endpoint returned status {}: {}",
                status, body
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExportError::Auth(format!("failed to parse token response: {}", e)))?;

        let token = body
            .jwt_token
            .ok_or_else(|| ExportError::Auth("token response missing jwt_token".to_string()))?;

        tracing::info!("minted bearer token");
        Ok(token)
    }
}
