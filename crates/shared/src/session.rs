//! Google OAuth session shared by the Gmail and Docs clients.
//!
//! The token file uses the layout written by google-auth's
//! `Credentials.to_json()`. The session is created once at startup and
//! passed by reference into every Google-facing call.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    /// The access token (google-auth writes this as "token")
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// RFC 3339 expiry
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Treat a token as expired within 60 seconds of its expiry, or when the
/// expiry is missing or unreadable.
pub fn is_token_expired(token: &GoogleToken) -> bool {
    let Some(expiry) = token.expiry.as_deref() else {
        return true;
    };
    match chrono::DateTime::parse_from_rfc3339(expiry) {
        Ok(expiry) => expiry <= chrono::Utc::now() + chrono::Duration::seconds(60),
        Err(_) => true,
    }
}

pub struct GoogleSession {
    client: Client,
    token: Mutex<GoogleToken>,
    token_path: Option<PathBuf>,
}

impl GoogleSession {
    /// Load the token from disk and make sure it is usable. Called once at
    /// startup; every failure here is an `AuthenticationFailure`.
    pub async fn initialize(token_path: &Path) -> Result<Self> {
        if !token_path.exists() {
            return Err(Error::AuthenticationFailure(format!(
                "Google token not found at {}. Authorize Gmail and Docs access first.",
                token_path.display()
            )));
        }

        let content = fs::read_to_string(token_path).map_err(|e| {
            Error::AuthenticationFailure(format!(
                "Could not read {}: {}",
                token_path.display(),
                e
            ))
        })?;
        let token: GoogleToken = serde_json::from_str(&content).map_err(|e| {
            Error::AuthenticationFailure(format!(
                "Invalid token file {}: {}",
                token_path.display(),
                e
            ))
        })?;

        let session = Self::with_token(token, Some(token_path.to_path_buf()))?;
        let expired = is_token_expired(&*session.token.lock().await);
        if expired {
            session.refresh().await?;
        }

        info!("Google session ready");
        Ok(session)
    }

    /// Build a session around an in-memory token. With no path, refreshed
    /// tokens are not persisted.
    pub fn with_token(token: GoogleToken, token_path: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: Mutex::new(token),
            token_path,
        })
    }

    pub async fn account(&self) -> Option<String> {
        self.token.lock().await.account.clone()
    }

    /// Current bearer token, refreshed first if it has expired.
    pub async fn access_token(&self) -> Result<String> {
        {
            let token = self.token.lock().await;
            if !is_token_expired(&token) {
                return Ok(token.token.clone());
            }
        }
        self.refresh().await?;
        Ok(self.token.lock().await.token.clone())
    }

    /// Force the next `access_token` call to refresh.
    pub async fn invalidate(&self) {
        debug!("Invalidating Google session");
        self.token.lock().await.expiry = None;
    }

    /// Exchange the refresh token for a new access token and persist it.
    pub async fn refresh(&self) -> Result<()> {
        let mut token = self.token.lock().await;

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            Error::AuthenticationFailure(
                "Access token expired and no refresh token is available".to_string(),
            )
        })?;

        let mut body = format!(
            "client_id={}&refresh_token={}&grant_type=refresh_token",
            urlencoding::encode(&token.client_id),
            urlencoding::encode(&refresh_token)
        );
        if let Some(secret) = token.client_secret.as_deref() {
            body.push_str(&format!("&client_secret={}", urlencoding::encode(secret)));
        }

        let response = self
            .client
            .post(&token.token_uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::AuthenticationFailure(format!("Token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::AuthenticationFailure(format!(
                "Token refresh rejected ({status}): {error_text}"
            )));
        }

        let refreshed = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| Error::AuthenticationFailure(format!("Bad refresh response: {e}")))?;

        let expires_in = refreshed.expires_in.unwrap_or(3600);
        token.token = refreshed.access_token;
        token.expiry = Some((chrono::Utc::now() + chrono::Duration::seconds(expires_in)).to_rfc3339());

        if let Some(path) = &self.token_path {
            let json = serde_json::to_string_pretty(&*token)?;
            fs::write(path, json)?;
            debug!("Persisted refreshed token to {}", path.display());
        }

        Ok(())
    }
}
