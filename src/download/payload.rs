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


//! Subtitle payload wire format
//!
//! `DownloadSubtitles` returns each file as base64 text wrapping a compressed
//! stream. The service sends gzip members, but the stream is decoded the way
//! zlib does with window bits `15 + 32`: a gzip header is detected by its magic
//! bytes and anything else is read as a zlib stream.

use crate::error::{Result, SubtitleError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode a base64 payload and decompress it
///
/// # Errors
/// `MalformedPayload` if the text is not base64 or the stream does not inflate.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(SubtitleError::malformed("empty payload"));
    }

    let compressed = STANDARD
        .decode(cleaned)
        .map_err(|e| SubtitleError::malformed(format!("invalid base64: {}", e)))?;

    decompress(&compressed)
}

/// Inflate a gzip or zlib stream, picking the format from the header
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    let read = if compressed.starts_with(&GZIP_MAGIC) {
        MultiGzDecoder::new(compressed).read_to_end(&mut out)
    } else {
        ZlibDecoder::new(compressed).read_to_end(&mut out)
    };

    read.map_err(|e| SubtitleError::malformed(format!("decompression failed: {}", e)))?;
    Ok(out)
}
