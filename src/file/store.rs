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


//! Saving downloaded subtitles to disk
//!
//! # Placement
//! - Preferred: next to the media file, as `{movieBaseName}.{format}`
//! - Fallback: `<user cache dir>/totem/subtitles/{movieBaseName}.{format}`
//!   when the media directory cannot be written
//!
//! Before writing, every `{movieBaseName}.{ext}` with an allow-listed subtitle
//! extension in the target directory is deleted so the player does not pick up
//! a stale file. Writes go through a temp file and a rename.

use crate::api::models::{is_allowed_format, SUBTITLE_FORMATS};
use crate::error::{Result, SubtitleError};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Cache sub-directory used when the media directory is read-only
pub const CACHE_SUBDIR: &str = "totem/subtitles";

/// Writes subtitle files beside the media or into the cache directory
#[derive(Debug, Clone)]
pub struct SubtitleStore {
    cache_dir: PathBuf,
}

impl SubtitleStore {
    /// Create a store that falls back to `cache_dir`
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Create a store using the per-user cache directory
    pub fn with_default_cache() -> Result<Self> {
        let dirs = BaseDirs::new().ok_or_else(|| {
            SubtitleError::InvalidConfiguration("Could not determine the user cache directory".to_string())
        })?;
        Ok(Self::new(dirs.cache_dir().join(CACHE_SUBDIR)))
    }

    /// Fallback directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Save `contents` for `media_path` and return the written file
    ///
    /// Tries the media directory first, then the cache directory.
    ///
    /// # Errors
    /// `InvalidPath` if `format` is not an allow-listed subtitle extension.
    pub async fn save(&self, media_path: &Path, format: &str, contents: &[u8]) -> Result<PathBuf> {
        if !is_allowed_format(format) {
            return Err(SubtitleError::InvalidPath(format!(
                "'{}' is not a subtitle file extension",
                format
            )));
        }

        let movie_name = movie_base_name(media_path)?;
        let file_name = format!("{}.{}", movie_name, format);

        if let Some(media_dir) = media_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            match self.save_into(media_dir, &movie_name, &file_name, contents).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    warn!(
                        dir = %media_dir.display(),
                        error = %e,
                        "Could not save subtitle next to the media, using cache directory"
                    );
                }
            }
        }

        self.save_into(&self.cache_dir, &movie_name, &file_name, contents).await
    }

    async fn save_into(
        &self,
        dir: &Path,
        movie_name: &str,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf> {
        ensure_directory_exists(dir).await?;

        for ext in SUBTITLE_FORMATS {
            delete_if_exists(&dir.join(format!("{}.{}", movie_name, ext))).await?;
        }

        let destination = dir.join(file_name);
        atomic_write(&destination, contents).await?;
        debug!(path = %destination.display(), bytes = contents.len(), "Saved subtitle file");

        Ok(destination)
    }
}

/// File name of `media_path` without its last extension
pub fn movie_base_name(media_path: &Path) -> Result<String> {
    let name = media_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SubtitleError::InvalidPath(media_path.display().to_string()))?;

    let base = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };

    Ok(base.to_string())
}

/// Delete a file; not an error if it doesn't exist
async fn delete_if_exists(path: &Path) -> Result<()> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    fs::remove_file(path).await.map_err(|e| {
        SubtitleError::IoError(std::io::Error::new(
            e.kind(),
            format!("Delete failed: {}: {}", path.display(), e),
        ))
    })?;
    debug!(path = %path.display(), "Removed previous subtitle file");

    Ok(())
}

/// Create `path` and its parents if needed
async fn ensure_directory_exists(path: &Path) -> Result<()> {
    if fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    fs::create_dir_all(path).await?;
    Ok(())
}

/// Write to a temp file in the same directory, then rename over `path`
async fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("subtitle");
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp_path, contents).await?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_movie_base_name() {
        assert_eq!(movie_base_name(Path::new("/films/Night.of.the.Living.Dead.avi")).unwrap(), "Night.of.the.Living.Dead");
        assert_eq!(movie_base_name(Path::new("clip.mkv")).unwrap(), "clip");
        assert_eq!(movie_base_name(Path::new("/films/noext")).unwrap(), "noext");
        assert_eq!(movie_base_name(Path::new("/films/.hidden")).unwrap(), ".hidden");
        assert!(movie_base_name(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_save_next_to_media() {
        let temp_dir = TempDir::new().unwrap();
        let media = temp_dir.path().join("movie.avi");
        std::fs::write(&media, b"video").unwrap();
        let store = SubtitleStore::new(temp_dir.path().join("cache"));

        let written = store.save(&media, "srt", b"1\nhello\n").await.unwrap();

        assert_eq!(written, temp_dir.path().join("movie.srt"));
        assert_eq!(std::fs::read(&written).unwrap(), b"1\nhello\n");
        assert!(!temp_dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_format() {
        let temp_dir = TempDir::new().unwrap();
        let media = temp_dir.path().join("films").join("movie.avi");
        let store = SubtitleStore::new(temp_dir.path().join("cache"));

        for format in ["../x", "exe", ""] {
            let err = store.save(&media, format, b"data").await.unwrap_err();
            assert!(matches!(err, SubtitleError::InvalidPath(_)), "{}", format);
        }
        assert!(!temp_dir.path().join("x").exists());
        assert!(!temp_dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_save_removes_previous_subtitles() {
        let temp_dir = TempDir::new().unwrap();
        let media = temp_dir.path().join("movie.avi");
        std::fs::write(&media, b"video").unwrap();
        std::fs::write(temp_dir.path().join("movie.sub"), b"old").unwrap();
        std::fs::write(temp_dir.path().join("movie.ass"), b"old").unwrap();
        std::fs::write(temp_dir.path().join("other.srt"), b"keep").unwrap();
        let store = SubtitleStore::new(temp_dir.path().join("cache"));

        store.save(&media, "srt", b"new").await.unwrap();

        assert!(!temp_dir.path().join("movie.sub").exists());
        assert!(!temp_dir.path().join("movie.ass").exists());
        assert!(temp_dir.path().join("other.srt").exists());
        assert!(temp_dir.path().join("movie.avi").exists());
        assert_eq!(std::fs::read(temp_dir.path().join("movie.srt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_falls_back_to_cache_when_media_dir_unusable() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the media directory should be makes it unwritable
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let media = blocker.join("movie.avi");
        let cache = temp_dir.path().join("cache");
        let store = SubtitleStore::new(cache.clone());

        let written = store.save(&media, "ssa", b"data").await.unwrap();

        assert_eq!(written, cache.join("movie.ssa"));
        assert_eq!(std::fs::read(&written).unwrap(), b"data");
    }
}
