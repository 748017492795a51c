//! HTTP API client for the account endpoints the game client needs.

use anyhow::{Context, Result};
use serde::Deserialize;

/// API client for communicating with the Schafkopf server
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Error body returned by the server on failed requests.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: String,
}

/// The logged-in account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            access_token: None,
        }
    }

    /// Create a client that reuses an existing access token
    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.access_token = Some(token.into());
        client
    }

    /// Login with username and password, returning the access token
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .context("Failed to send login request")?;

        if !response.status().is_success() {
            anyhow::bail!("Login failed: {}", error_detail(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        self.access_token = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    /// Look up the account the access token belongs to
    pub async fn current_user(&self) -> Result<CurrentUser> {
        let token = self.access_token.as_ref().context("Not authenticated")?;

        let response = self
            .client
            .get(format!("{}/api/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send user lookup request")?;

        if !response.status().is_success() {
            anyhow::bail!("User lookup failed: {}", error_detail(response).await);
        }

        response
            .json()
            .await
            .context("Failed to parse user response")
    }

    /// Get access token for WebSocket authentication
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

/// Best-effort extraction of the server's error message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.detail)
            .unwrap_or_else(|_| format!("{status}: {body}")),
        Err(e) => format!("{status}: failed to read error response: {e}"),
    }
}
