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


//! Subtitle search with title fallback
//!
//! # Flow
//! 1. Lock the session and make sure it is logged in
//! 2. Query by fingerprint (`moviehash` + `moviebytesize`)
//! 3. If that found nothing or faulted, query by movie title
//! 4. Return the first non-empty list, in service order
//!
//! Results are returned unfiltered; callers that display them apply
//! [`filter_allowed`](crate::api::models::filter_allowed).

use crate::api::models::{SearchCriteria, SearchResult};
use crate::api::session::{LockedSession, SubtitleSession};
use crate::error::{Result, SubtitleError};
use crate::file::Fingerprint;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one query attempt
enum Attempt {
    Found(Vec<SearchResult>),
    Empty,
    Faulted(SubtitleError),
}

/// Runs hash-then-title searches against a session
#[derive(Clone)]
pub struct SearchCoordinator {
    session: Arc<SubtitleSession>,
}

impl SearchCoordinator {
    pub fn new(session: Arc<SubtitleSession>) -> Self {
        Self { session }
    }

    /// Search subtitles for a fingerprinted movie
    ///
    /// # Errors
    /// - `LoginFailed` if the session cannot log in
    /// - `ContactError` if the last query issued faulted
    /// - `NoResults` if every query came back empty
    pub async fn search(&self, fingerprint: &Fingerprint, movie_title: &str) -> Result<Vec<SearchResult>> {
        let mut session = self.session.lock().await;
        session.ensure_logged_in().await?;

        let language = session.language().to_string();

        let by_hash = SearchCriteria::by_hash(&language, fingerprint);
        let mut last = Self::query(&session, by_hash).await;
        if let Attempt::Found(results) = last {
            info!(hash = %fingerprint, count = results.len(), "Found subtitles by hash");
            return Ok(results);
        }

        let title = movie_title.trim();
        if title.is_empty() {
            debug!("No movie title to fall back on");
        } else {
            debug!(title, "Hash search found nothing, searching by title");
            last = Self::query(&session, SearchCriteria::by_title(&language, title)).await;
            if let Attempt::Found(results) = last {
                info!(title, count = results.len(), "Found subtitles by title");
                return Ok(results);
            }
        }

        match last {
            Attempt::Faulted(e) => Err(SubtitleError::contact(e)),
            _ => Err(SubtitleError::NoResults),
        }
    }

    async fn query(session: &LockedSession<'_>, criteria: SearchCriteria) -> Attempt {
        match session.search_subtitles(&[criteria]).await {
            Ok(response) if !response.data.is_empty() => Attempt::Found(response.data),
            Ok(_) => Attempt::Empty,
            Err(e) => {
                warn!(error = %e, "Subtitle search failed");
                Attempt::Faulted(e)
            }
        }
    }
}
