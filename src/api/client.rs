// subtitles-core - Subtitle lookup for media players
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! HTTP client for the OpenSubtitles XML-RPC endpoint
//!
//! This module provides the production [`SubtitleTransport`] with features including:
//! - XML-RPC request encoding and response decoding
//! - Retry logic with exponential backoff for transient faults
//! - Configurable endpoint, user agent and timeout
//!
//! # Retry Strategy
//! - Maximum 3 attempts by default (1 initial + 2 retries)
//! - Exponential backoff: 1s, 2s, 4s between retries
//! - Retry on: connect errors, timeouts, 5xx responses
//! - No retry on: 4xx responses, XML-RPC faults, malformed responses
//!
//! Session-level policy (keepalive, re-login) lives in
//! [`SubtitleSession`](crate::api::session::SubtitleSession), not here.

use crate::api::models::{
    DownloadResponse, LoginResponse, SearchCriteria, SearchResponse, StatusResponse,
};
use crate::api::transport::SubtitleTransport;
use crate::api::xmlrpc::{self, Value};
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default XML-RPC endpoint
pub const DEFAULT_ENDPOINT: &str = "http://api.opensubtitles.org/xml-rpc";

/// User agent registered with the service
pub const DEFAULT_USER_AGENT: &str = "Totem";

/// Maximum attempts for one call (1 initial + 2 retries)
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial retry delay in seconds (exponential backoff: 1s, 2s, 4s)
const INITIAL_RETRY_DELAY_SECS: u64 = 1;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for OpenSubtitlesClient
/// Provides a builder pattern for client customization
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: MAX_RETRY_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts.max(1);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// XML-RPC client for the subtitle service
///
/// # Example
/// ```rust,no_run
/// use subtitles_core::api::client::OpenSubtitlesClient;
/// use subtitles_core::api::transport::SubtitleTransport;
///
/// # async fn example() -> subtitles_core::error::Result<()> {
/// let client = OpenSubtitlesClient::new()?;
/// let login = client.log_in("", "", "eng", "Totem").await?;
/// println!("status: {:?}", login.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenSubtitlesClient {
    /// Underlying HTTP client
    client: Client,
    /// Client configuration
    config: ClientConfig,
}

impl OpenSubtitlesClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// Returns error if the user agent is not a valid header value or the
    /// HTTP client cannot be built
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| {
                SubtitleError::InvalidConfiguration(format!("Invalid user agent: {}", e))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invoke an XML-RPC method and return its decoded result
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = xmlrpc::encode_call(method, params);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.send_once(&body).await {
                Ok(bytes) => {
                    debug!(method, bytes = bytes.len(), "XML-RPC call completed");
                    return xmlrpc::decode_response(&bytes);
                }
                Err(e) if attempts < self.config.max_attempts && is_retryable(&e) => {
                    let delay = Duration::from_secs(INITIAL_RETRY_DELAY_SECS * 2_u64.pow(attempts - 1));
                    warn!(method, attempt = attempts, error = %e, "XML-RPC call failed, retrying in {:?}", delay);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, body: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubtitleError::UnexpectedStatus {
                status_code: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Connect errors, timeouts and server errors may clear up on their own
fn is_retryable(error: &SubtitleError) -> bool {
    match error {
        SubtitleError::ReqwestError(e) => e.is_timeout() || e.is_connect(),
        SubtitleError::UnexpectedStatus { status_code } => (500..=599).contains(status_code),
        _ => false,
    }
}

#[async_trait]
impl SubtitleTransport for OpenSubtitlesClient {
    async fn log_in(
        &self,
        username: &str,
        password: &str,
        language: &str,
        user_agent: &str,
    ) -> Result<LoginResponse> {
        let params = [
            Value::from(username),
            Value::from(password),
            Value::from(language),
            Value::from(user_agent),
        ];
        let value = self.call("LogIn", &params).await?;
        Ok(LoginResponse::from_value(&value))
    }

    async fn no_operation(&self, token: &str) -> Result<StatusResponse> {
        let value = self.call("NoOperation", &[Value::from(token)]).await?;
        Ok(StatusResponse::from_value(&value))
    }

    async fn search_subtitles(
        &self,
        token: &str,
        criteria: &[SearchCriteria],
    ) -> Result<SearchResponse> {
        let criteria = criteria.iter().map(SearchCriteria::to_value).collect::<Vec<_>>();
        let value = self
            .call("SearchSubtitles", &[Value::from(token), Value::Array(criteria)])
            .await?;
        Ok(SearchResponse::from_value(&value))
    }

    async fn download_subtitles(&self, token: &str, ids: &[String]) -> Result<DownloadResponse> {
        let ids = ids.iter().map(|id| Value::from(id.as_str())).collect::<Vec<_>>();
        let value = self
            .call("DownloadSubtitles", &[Value::from(token), Value::Array(ids)])
            .await?;
        Ok(DownloadResponse::from_value(&value))
    }
}

// ===== TESTS =====
