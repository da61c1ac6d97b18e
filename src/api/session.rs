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


//! Session token handling
//!
//! # State Machine
//! ```text
//! LoggedOut -> LoggingIn -> LoggedIn -> (NoOpFailed -> LoggingIn)
//! ```
//!
//! - A held token is revalidated with `NoOperation` before reuse
//! - A rejected or faulted keepalive drops the token and logs in again, once
//! - Logins are anonymous (empty user name and password)
//!
//! # Locking
//! One `tokio::sync::Mutex` guards the token and language. Search and download
//! take the lock through [`SubtitleSession::lock`] and keep it for their whole
//! request, so login always finishes before the dependent call is made and two
//! operations never race on the token.

use crate::api::models::{DownloadResponse, SearchCriteria, SearchResponse};
use crate::api::transport::SubtitleTransport;
use crate::error::{Result, SubtitleError};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Mutable part of a session
#[derive(Debug, Clone)]
struct SessionState {
    token: Option<String>,
    language: String,
}

/// Authenticated connection to the subtitle service
pub struct SubtitleSession {
    transport: Arc<dyn SubtitleTransport>,
    user_agent: String,
    state: Mutex<SessionState>,
}

impl SubtitleSession {
    /// Create a logged-out session
    ///
    /// # Arguments
    /// * `transport` - Remote service access
    /// * `language` - 3-letter service language code (e.g. `eng`)
    /// * `user_agent` - User agent sent with `LogIn`
    pub fn new<L, U>(transport: Arc<dyn SubtitleTransport>, language: L, user_agent: U) -> Self
    where
        L: Into<String>,
        U: Into<String>,
    {
        Self {
            transport,
            user_agent: user_agent.into(),
            state: Mutex::new(SessionState {
                token: None,
                language: language.into(),
            }),
        }
    }

    /// Take the session lock
    ///
    /// Everything done through the returned guard is serialized with every
    /// other user of this session.
    pub async fn lock(&self) -> LockedSession<'_> {
        LockedSession {
            transport: self.transport.as_ref(),
            user_agent: &self.user_agent,
            state: self.state.lock().await,
        }
    }

    /// Make sure a valid token is held
    ///
    /// Convenience wrapper around [`LockedSession::ensure_logged_in`].
    pub async fn ensure_logged_in(&self) -> Result<()> {
        self.lock().await.ensure_logged_in().await
    }

    /// Current subtitle language
    pub async fn language(&self) -> String {
        self.state.lock().await.language.clone()
    }

    /// Change the subtitle language for later searches
    ///
    /// The token is kept: the service binds the language to each query, the
    /// login language only affects server messages.
    pub async fn set_language<L: Into<String>>(&self, language: L) {
        self.state.lock().await.language = language.into();
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// Forget the token; the next operation logs in again
    pub async fn log_out(&self) {
        self.state.lock().await.token = None;
    }
}

/// Exclusive access to a session while a request is in flight
pub struct LockedSession<'a> {
    transport: &'a dyn SubtitleTransport,
    user_agent: &'a str,
    state: MutexGuard<'a, SessionState>,
}

impl LockedSession<'_> {
    /// Make sure a valid token is held, logging in if needed
    ///
    /// Idempotent and cheap to call before every request: with a live token
    /// it costs one `NoOperation` round trip.
    ///
    /// # Errors
    /// `LoginFailed` when `LogIn` faults, is rejected, or returns no token.
    pub async fn ensure_logged_in(&mut self) -> Result<()> {
        if let Some(token) = self.state.token.clone() {
            match self.transport.no_operation(&token).await {
                Ok(response) if response.is_ok() => {
                    debug!(token = %mask_token(&token), "Session token still valid");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(status = ?response.status, "Keepalive rejected, logging in again");
                }
                Err(e) => {
                    debug!(error = %e, "Keepalive failed, logging in again");
                }
            }
            self.state.token = None;
        }

        let response = match self
            .transport
            .log_in("", "", &self.state.language, self.user_agent)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Could not reach the service to log in");
                return Err(SubtitleError::login_failed(e.to_string()));
            }
        };

        match response.token.as_deref() {
            Some(token) if response.is_ok() && !token.is_empty() => {
                info!(token = %mask_token(token), language = %self.state.language, "Logged in");
                self.state.token = Some(token.to_string());
                Ok(())
            }
            _ => {
                warn!(status = ?response.status, "Login rejected");
                Err(SubtitleError::login_failed(format!(
                    "login returned status {:?} without a usable token",
                    response.status
                )))
            }
        }
    }

    /// Held token, if logged in
    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    /// Current subtitle language
    pub fn language(&self) -> &str {
        &self.state.language
    }

    /// Run `SearchSubtitles` with the held token
    pub async fn search_subtitles(&self, criteria: &[SearchCriteria]) -> Result<SearchResponse> {
        let token = self.require_token()?;
        self.transport.search_subtitles(token, criteria).await
    }

    /// Run `DownloadSubtitles` with the held token
    pub async fn download_subtitles(&self, ids: &[String]) -> Result<DownloadResponse> {
        let token = self.require_token()?;
        self.transport.download_subtitles(token, ids).await
    }

    fn require_token(&self) -> Result<&str> {
        self.token()
            .ok_or_else(|| SubtitleError::login_failed("no session token held"))
    }
}

/// Short prefix of a token, for logs
fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{LoginResponse, StatusResponse};
    use crate::api::transport::mock::{MockTransport, Reply};

    fn session_with(mock: &Arc<MockTransport>) -> SubtitleSession {
        SubtitleSession::new(mock.clone(), "eng", "Totem")
    }

    #[tokio::test]
    async fn test_second_call_uses_keepalive() {
        let mock = Arc::new(MockTransport::new());
        let session = session_with(&mock);

        session.ensure_logged_in().await.unwrap();
        session.ensure_logged_in().await.unwrap();

        assert_eq!(MockTransport::calls(&mock.login_calls), 1);
        assert_eq!(MockTransport::calls(&mock.noop_calls), 1);
        assert!(session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_rejected_keepalive_logs_in_again() {
        let mock = Arc::new(MockTransport::new());
        let session = session_with(&mock);
        session.ensure_logged_in().await.unwrap();

        *mock.noop.lock().unwrap() = Reply::Ok(StatusResponse {
            status: Some("406 No session".to_string()),
        });
        *mock.login.lock().unwrap() = Reply::Ok(LoginResponse {
            status: Some("200 OK".to_string()),
            token: Some("token-2".to_string()),
        });
        session.ensure_logged_in().await.unwrap();

        assert_eq!(MockTransport::calls(&mock.login_calls), 2);
        assert_eq!(session.lock().await.token(), Some("token-2"));
    }

    #[tokio::test]
    async fn test_faulted_keepalive_is_swallowed() {
        let mock = Arc::new(MockTransport::new());
        let session = session_with(&mock);
        session.ensure_logged_in().await.unwrap();

        *mock.noop.lock().unwrap() = Reply::Fault;
        session.ensure_logged_in().await.unwrap();

        assert_eq!(MockTransport::calls(&mock.login_calls), 2);
    }

    #[tokio::test]
    async fn test_login_fault_is_returned_not_raised() {
        let mock = Arc::new(MockTransport::new());
        *mock.login.lock().unwrap() = Reply::Fault;
        let session = session_with(&mock);

        let err = session.ensure_logged_in().await.unwrap_err();
        assert!(matches!(err, SubtitleError::LoginFailed { .. }));
        assert_eq!(err.user_message(), "Could not contact the OpenSubtitles website");
        assert!(!session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let mock = Arc::new(MockTransport::new());
        *mock.login.lock().unwrap() = Reply::Ok(LoginResponse {
            status: Some("200 OK".to_string()),
            token: Some(String::new()),
        });
        let session = session_with(&mock);

        assert!(session.ensure_logged_in().await.is_err());

        *mock.login.lock().unwrap() = Reply::Ok(LoginResponse {
            status: Some("401 Unauthorized".to_string()),
            token: Some("abc".to_string()),
        });
        assert!(session.ensure_logged_in().await.is_err());
        assert!(!session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_login_uses_session_language() {
        let mock = Arc::new(MockTransport::new());
        let session = session_with(&mock);
        session.set_language("ger").await;

        session.ensure_logged_in().await.unwrap();

        assert_eq!(mock.last_language.lock().unwrap().as_deref(), Some("ger"));
        assert_eq!(session.language().await, "ger");
    }

    #[tokio::test]
    async fn test_log_out_forces_new_login() {
        let mock = Arc::new(MockTransport::new());
        let session = session_with(&mock);
        session.ensure_logged_in().await.unwrap();

        session.log_out().await;
        session.ensure_logged_in().await.unwrap();

        assert_eq!(MockTransport::calls(&mock.login_calls), 2);
        assert_eq!(MockTransport::calls(&mock.noop_calls), 0);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefgh"), "abcd…");
        assert_eq!(mask_token("ab"), "ab…");
    }
}
