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


//! Fetching one subtitle file by id
//!
//! # Flow
//! 1. Lock the session and make sure it is logged in
//! 2. `DownloadSubtitles(token, [id])`
//! 3. Check the status and take `data[0].data`
//! 4. Base64-decode and inflate it (see [`payload`](crate::download::payload))
//!
//! Every failure is returned as an error value; nothing here is fatal to the
//! process.

use crate::api::session::SubtitleSession;
use crate::download::payload::decode_payload;
use crate::error::{Result, SubtitleError};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};

/// A decoded subtitle file, handed over to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedSubtitle {
    pub subtitle_id: String,
    pub content: Vec<u8>,
}

impl DownloadedSubtitle {
    /// Content as text (invalid UTF-8 replaced)
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Downloads subtitle payloads through a session
#[derive(Clone)]
pub struct DownloadCoordinator {
    session: Arc<SubtitleSession>,
}

impl DownloadCoordinator {
    pub fn new(session: Arc<SubtitleSession>) -> Self {
        Self { session }
    }

    /// Download and decode the subtitle file `subtitle_id`
    ///
    /// # Errors
    /// - `LoginFailed` if the session cannot log in
    /// - `ContactError` on a transport fault or a non-OK status
    /// - `MalformedPayload` if the payload is missing or does not decode
    pub async fn download(&self, subtitle_id: &str) -> Result<DownloadedSubtitle> {
        let mut session = self.session.lock().await;
        session.ensure_logged_in().await?;

        let response = session
            .download_subtitles(&[subtitle_id.to_string()])
            .await
            .map_err(|e| {
                warn!(subtitle_id, error = %e, "Subtitle download failed");
                SubtitleError::contact(e)
            })?;
        drop(session);

        if !response.is_ok() {
            warn!(subtitle_id, status = ?response.status, "Subtitle download rejected");
            return Err(SubtitleError::contact(format!(
                "download returned status {:?}",
                response.status
            )));
        }

        let encoded = response
            .first_payload()
            .ok_or_else(|| SubtitleError::malformed("response has no data[0].data"))?;
        let content = decode_payload(encoded)?;

        info!(subtitle_id, bytes = content.len(), "Downloaded subtitle");
        Ok(DownloadedSubtitle {
            subtitle_id: subtitle_id.to_string(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{DownloadResponse, EncodedSubtitle, STATUS_OK};
    use crate::api::transport::mock::{MockTransport, Reply};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn coordinator(mock: &Arc<MockTransport>) -> DownloadCoordinator {
        DownloadCoordinator::new(Arc::new(SubtitleSession::new(mock.clone(), "eng", "Totem")))
    }

    fn response_with(data: Option<String>) -> DownloadResponse {
        DownloadResponse {
            status: Some(STATUS_OK.to_string()),
            data: vec![EncodedSubtitle {
                id: Some("7".to_string()),
                data,
            }],
        }
    }

    #[tokio::test]
    async fn test_download_decodes_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"1\n00:00:00,000 --> 00:00:01,000\nhi\n").unwrap();
        let payload = STANDARD.encode(encoder.finish().unwrap());

        let mock = Arc::new(MockTransport::new());
        *mock.download.lock().unwrap() = Reply::Ok(response_with(Some(payload)));

        let subtitle = coordinator(&mock).download("7").await.unwrap();

        assert_eq!(subtitle.subtitle_id, "7");
        assert_eq!(subtitle.text(), "1\n00:00:00,000 --> 00:00:01,000\nhi\n");
    }

    #[tokio::test]
    async fn test_missing_payload_is_contact_failure() {
        let mock = Arc::new(MockTransport::new());
        *mock.download.lock().unwrap() = Reply::Ok(response_with(None));

        let err = coordinator(&mock).download("7").await.unwrap_err();

        assert!(matches!(err, SubtitleError::MalformedPayload(_)));
        assert_eq!(err.user_message(), "Could not contact the OpenSubtitles website.");
    }

    #[tokio::test]
    async fn test_empty_data_list_is_malformed() {
        let mock = Arc::new(MockTransport::new());
        *mock.download.lock().unwrap() = Reply::Ok(DownloadResponse {
            status: Some(STATUS_OK.to_string()),
            data: Vec::new(),
        });

        let err = coordinator(&mock).download("7").await.unwrap_err();
        assert!(matches!(err, SubtitleError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_transport_fault_and_bad_status() {
        let mock = Arc::new(MockTransport::new());
        *mock.download.lock().unwrap() = Reply::Fault;
        let err = coordinator(&mock).download("7").await.unwrap_err();
        assert!(matches!(err, SubtitleError::ContactError { .. }));

        *mock.download.lock().unwrap() = Reply::Ok(DownloadResponse {
            status: Some("407 Download limit reached".to_string()),
            data: Vec::new(),
        });
        let err = coordinator(&mock).download("7").await.unwrap_err();
        assert_eq!(err.user_message(), "Could not contact the OpenSubtitles website.");
    }

    #[tokio::test]
    async fn test_login_failure_short_circuits() {
        let mock = Arc::new(MockTransport::new());
        *mock.login.lock().unwrap() = Reply::Fault;

        let err = coordinator(&mock).download("7").await.unwrap_err();

        assert!(matches!(err, SubtitleError::LoginFailed { .. }));
        assert_eq!(MockTransport::calls(&mock.download_calls), 0);
    }
}
