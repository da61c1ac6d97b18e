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


//! Transport seam between the coordinators and the remote service
//!
//! [`OpenSubtitlesClient`](crate::api::client::OpenSubtitlesClient) is the real
//! implementation; tests plug in stubs that count calls.

use crate::api::models::{
    DownloadResponse, LoginResponse, SearchCriteria, SearchResponse, StatusResponse,
};
use crate::error::Result;
use async_trait::async_trait;

/// The four remote methods the client needs
///
/// An `Err` from any method is a transport fault; the coordinators decide how
/// to surface it.
#[async_trait]
pub trait SubtitleTransport: Send + Sync {
    async fn log_in(
        &self,
        username: &str,
        password: &str,
        language: &str,
        user_agent: &str,
    ) -> Result<LoginResponse>;

    async fn no_operation(&self, token: &str) -> Result<StatusResponse>;

    async fn search_subtitles(
        &self,
        token: &str,
        criteria: &[SearchCriteria],
    ) -> Result<SearchResponse>;

    async fn download_subtitles(&self, token: &str, ids: &[String]) -> Result<DownloadResponse>;
}
