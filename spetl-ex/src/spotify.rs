//! Spotify Web API client
//!
//! Client-credentials authorization with a cached access token, and the
//! playlist tracks endpoint. Pages are returned untyped so they can be staged
//! exactly as the API produced them.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use spetl_common::config::SpotifyCredentials;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("spetl/", env!("CARGO_PKG_VERSION"));

/// Tokens are refreshed this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authorization failed: {0}")]
    AuthError(String),

    #[error("Rate limit exceeded (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Source of playlist pages
///
/// The extraction run depends on this seam rather than on the HTTP client.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// First page of a playlist's entries, at most `limit` items
    async fn playlist_tracks(&self, playlist_id: &str, limit: u32) -> Result<Value, SpotifyError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    credentials: SpotifyCredentials,
    token_url: String,
    api_base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self, SpotifyError> {
        Self::with_endpoints(credentials, SPOTIFY_TOKEN_URL, SPOTIFY_API_BASE_URL)
    }

    /// Client against alternative token and API endpoints
    pub fn with_endpoints(
        credentials: SpotifyCredentials,
        token_url: &str,
        api_base_url: &str,
    ) -> Result<Self, SpotifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            token_url: token_url.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// Current access token, requesting a new one when missing or stale
    async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<CachedToken, SpotifyError> {
        tracing::debug!(url = %self.token_url, "Requesting Spotify access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpotifyError::AuthError(error_text));
        }
        let response = check_status(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::ParseError(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

/// Map non-success statuses to errors
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        return Err(SpotifyError::RateLimited { retry_after });
    }

    let error_text = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SpotifyError::AuthError(error_text));
    }
    Err(SpotifyError::ApiError(status.as_u16(), error_text))
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn playlist_tracks(&self, playlist_id: &str, limit: u32) -> Result<Value, SpotifyError> {
        let token = self.access_token().await?;
        let url = format!("{}/playlists/{}/tracks", self.api_base_url, playlist_id);

        tracing::debug!(playlist_id = %playlist_id, url = %url, "Querying Spotify playlist");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("limit", limit.to_string()),
                ("offset", "0".to_string()),
                ("additional_types", "track".to_string()),
            ])
            .send()
            .await
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        let page: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SpotifyError::ParseError(e.to_string()))?;

        tracing::info!(
            playlist_id = %playlist_id,
            items = page.get("items").and_then(serde_json::Value::as_array).map(Vec::len).unwrap_or(0),
            total = page.get("total").and_then(serde_json::Value::as_u64).unwrap_or(0),
            "Retrieved playlist page from Spotify"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> SpotifyCredentials {
        SpotifyCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(SpotifyClient::new(credentials()).is_ok());
    }

    #[test]
    fn test_api_base_trailing_slash_is_trimmed() {
        let client = SpotifyClient::with_endpoints(
            credentials(),
            "http://localhost/token",
            "http://localhost/v1/",
        )
        .unwrap();
        assert_eq!(client.api_base_url, "http://localhost/v1");
    }

    #[test]
    fn test_token_response_parses() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 3600);
    }
}
