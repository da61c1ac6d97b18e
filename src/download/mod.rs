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


//! Subtitle download and payload decoding
//!
//! This module fetches a chosen subtitle from the service and turns the
//! base64 + compressed payload back into the subtitle text.

pub mod coordinator;
pub mod payload;

// Re-export commonly used types
pub use coordinator::{DownloadCoordinator, DownloadedSubtitle};
pub use payload::decode_payload;
