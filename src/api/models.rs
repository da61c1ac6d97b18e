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


//! Request and response types of the subtitle service
//!
//! # Service Methods
//! - `LogIn(user, pass, lang, useragent) -> {status, token}`
//! - `NoOperation(token) -> {status}`
//! - `SearchSubtitles(token, [criteria]) -> {status, data: [...] | false}`
//! - `DownloadSubtitles(token, [id]) -> {status, data: [{idsubtitlefile, data}]}`
//!
//! Responses are converted from [`Value`] leniently: missing members become
//! `None` or empty lists, and the service's `data: false` means "no hits".

use crate::api::xmlrpc::Value;
use crate::error::{Result, SubtitleError};
use crate::file::Fingerprint;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Status string the service uses for success
pub const STATUS_OK: &str = "200 OK";

/// Subtitle file extensions the player can load
pub const SUBTITLE_FORMATS: [&str; 9] = ["asc", "txt", "sub", "vtt", "srt", "smi", "ssa", "ass", "mpl"];

/// Check a format against the allow-list (case-insensitive)
pub fn is_allowed_format(format: &str) -> bool {
    SUBTITLE_FORMATS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(format))
}

fn status_is_ok(status: &Option<String>) -> bool {
    status.as_deref() == Some(STATUS_OK)
}

fn text_member(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::to_text)
}

/// `LogIn` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginResponse {
    pub status: Option<String>,
    pub token: Option<String>,
}

impl LoginResponse {
    pub fn is_ok(&self) -> bool {
        status_is_ok(&self.status)
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            status: text_member(value, "status"),
            token: text_member(value, "token"),
        }
    }
}

/// Response carrying only a status (`NoOperation`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: Some(STATUS_OK.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        status_is_ok(&self.status)
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            status: text_member(value, "status"),
        }
    }
}

/// One search criterion sent to `SearchSubtitles`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// Exact match on the file fingerprint
    Hash {
        language: String,
        movie_hash: String,
        movie_byte_size: u64,
    },
    /// Free-text match on the movie title
    Title {
        language: String,
        query: String,
    },
}

impl SearchCriteria {
    pub fn by_hash(language: &str, fingerprint: &Fingerprint) -> Self {
        SearchCriteria::Hash {
            language: language.to_string(),
            movie_hash: fingerprint.hash_hex(),
            movie_byte_size: fingerprint.size(),
        }
    }

    pub fn by_title(language: &str, title: &str) -> Self {
        SearchCriteria::Title {
            language: language.to_string(),
            query: title.to_string(),
        }
    }

    /// Wire form; the byte size goes out as a string
    pub fn to_value(&self) -> Value {
        match self {
            SearchCriteria::Hash {
                language,
                movie_hash,
                movie_byte_size,
            } => Value::structure([
                ("sublanguageid", Value::from(language.as_str())),
                ("moviehash", Value::from(movie_hash.as_str())),
                ("moviebytesize", Value::from(movie_byte_size.to_string())),
            ]),
            SearchCriteria::Title { language, query } => Value::structure([
                ("sublanguageid", Value::from(language.as_str())),
                ("query", Value::from(query.as_str())),
            ]),
        }
    }
}

/// A subtitle offered by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Original subtitle file name (`SubFileName`)
    pub file_name: String,
    /// File extension (`SubFormat`)
    pub format: String,
    /// User rating as reported (`SubRating`)
    pub rating: String,
    /// Id to pass to `DownloadSubtitles` (`IDSubtitleFile`)
    pub remote_id: String,
}

impl SearchResult {
    /// Parse one entry of the `data` array
    ///
    /// Entries without an id cannot be downloaded and are rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let remote_id = text_member(value, "IDSubtitleFile")
            .ok_or_else(|| SubtitleError::invalid_xmlrpc("search result without IDSubtitleFile"))?;

        Ok(Self {
            file_name: text_member(value, "SubFileName").unwrap_or_default(),
            format: text_member(value, "SubFormat").unwrap_or_default(),
            rating: text_member(value, "SubRating").unwrap_or_default(),
            remote_id,
        })
    }

    /// Whether the player can load this format
    pub fn has_allowed_format(&self) -> bool {
        is_allowed_format(&self.format)
    }
}

/// Keep only results in an allow-listed format, preserving service order
pub fn filter_allowed(results: &[SearchResult]) -> Vec<SearchResult> {
    results
        .iter()
        .filter(|r| r.has_allowed_format())
        .cloned()
        .collect()
}

/// `SearchSubtitles` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub status: Option<String>,
    pub data: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn with_results(data: Vec<SearchResult>) -> Self {
        Self {
            status: Some(STATUS_OK.to_string()),
            data,
        }
    }

    /// Decode a response, skipping entries that cannot be downloaded
    ///
    /// `data` is `false` (or absent) when nothing was found.
    pub fn from_value(value: &Value) -> Self {
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match SearchResult::from_value(entry) {
                        Ok(result) => Some(result),
                        Err(e) => {
                            warn!(error = %e, "Skipping search result");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            status: text_member(value, "status"),
            data,
        }
    }
}

/// One compressed file inside a `DownloadSubtitles` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedSubtitle {
    pub id: Option<String>,
    /// Base64 of the gzip-compressed subtitle text
    pub data: Option<String>,
}

/// `DownloadSubtitles` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadResponse {
    pub status: Option<String>,
    pub data: Vec<EncodedSubtitle>,
}

impl DownloadResponse {
    pub fn is_ok(&self) -> bool {
        status_is_ok(&self.status)
    }

    /// Payload of the first file, if present
    pub fn first_payload(&self) -> Option<&str> {
        self.data.first().and_then(|f| f.data.as_deref())
    }

    pub fn from_value(value: &Value) -> Self {
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| EncodedSubtitle {
                        id: text_member(entry, "idsubtitlefile"),
                        data: text_member(entry, "data"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            status: text_member(value, "status"),
            data,
        }
    }
}
