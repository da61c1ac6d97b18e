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


//! Movie fingerprint used as the subtitle lookup key
//!
//! The service identifies a movie by a 64-bit checksum of its head and tail
//! plus its byte size, so the same rip is found regardless of its file name.
//!
//! # Algorithm
//! 1. Start with `hash = size`
//! 2. Add the first 65536 bytes, read as 8192 little-endian `i64` words
//! 3. Seek to `size - 65536` and add the last 65536 bytes the same way
//! 4. Every addition wraps at 64 bits
//!
//! The word count is fixed by the window size, so a trailing partial word is
//! never read even when the size is not a multiple of 8. For a file of exactly
//! 128 KiB the two windows cover the whole file once each.

use crate::error::{Result, SubtitleError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Size of each hashed window in bytes
pub const HASH_CHUNK_SIZE: u64 = 65536;

/// Smallest file that can be fingerprinted (two full windows)
pub const MIN_FILE_SIZE: u64 = HASH_CHUNK_SIZE * 2;

const WORD_SIZE: usize = 8;

/// Content fingerprint of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    hash: u64,
    size: u64,
}

impl Fingerprint {
    /// Fingerprint the file at `path`
    ///
    /// Blocking file I/O; run it on a worker thread, never on the UI thread.
    ///
    /// # Errors
    /// - `SizeTooSmall` if the file is shorter than [`MIN_FILE_SIZE`]
    /// - `SeekError` if the tail window cannot be reached
    /// - `IoError` if the file cannot be opened or read
    pub fn compute<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        Self::from_reader(BufReader::new(file), size)
    }

    /// Fingerprint an already-open stream of `size` bytes
    pub fn from_reader<R: Read + Seek>(mut reader: R, size: u64) -> Result<Self> {
        if size < MIN_FILE_SIZE {
            return Err(SubtitleError::SizeTooSmall {
                size,
                minimum: MIN_FILE_SIZE,
            });
        }

        let mut hash = size;

        reader.seek(SeekFrom::Start(0))?;
        hash = sum_window(&mut reader, hash)?;

        let tail_offset = size.saturating_sub(HASH_CHUNK_SIZE);
        let position = reader.seek(SeekFrom::Start(tail_offset))?;
        if position != tail_offset {
            return Err(SubtitleError::SeekError {
                expected: tail_offset,
                actual: position,
            });
        }
        hash = sum_window(&mut reader, hash)?;

        Ok(Self { hash, size })
    }

    /// Rebuild a fingerprint from known parts
    pub fn from_parts(hash: u64, size: u64) -> Self {
        Self { hash, size }
    }

    /// Raw 64-bit checksum
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Checksum as 16 zero-padded lowercase hex digits (the `moviehash` wire form)
    pub fn hash_hex(&self) -> String {
        format!("{:016x}", self.hash)
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.hash)
    }
}

/// Add one window of little-endian words into `hash`
fn sum_window<R: Read>(reader: &mut R, mut hash: u64) -> Result<u64> {
    let mut window = vec![0u8; HASH_CHUNK_SIZE as usize];
    reader.read_exact(&mut window)?;

    for chunk in window.chunks_exact(WORD_SIZE) {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(chunk);
        hash = hash.wrapping_add(i64::from_le_bytes(word) as u64);
    }

    Ok(hash)
}
