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


//! OpenSubtitles API client implementation
//!
//! This module talks to the OpenSubtitles XML-RPC service. It provides the wire
//! codec, the HTTP transport, session handling and subtitle search.

pub mod client;
pub mod models;
pub mod search;
pub mod session;
pub mod transport;
pub mod xmlrpc;

// Re-export commonly used types
pub use client::{ClientConfig, OpenSubtitlesClient};
pub use models::{filter_allowed, SearchCriteria, SearchResult, SUBTITLE_FORMATS};
pub use search::SearchCoordinator;
pub use session::{LockedSession, SubtitleSession};
pub use transport::SubtitleTransport;
