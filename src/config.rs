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

//! Persisted user settings
//!
//! Only the preferred subtitle language is stored. The file lives in the
//! per-user config directory as `settings.json`; when it does not exist the
//! language is taken from the process locale.

use crate::error::{Result, SubtitleError};
use crate::language;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SETTINGS_FILE: &str = "settings.json";

/// User settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Three-letter service code of the subtitle language
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: language::from_environment().to_string(),
        }
    }
}

impl Settings {
    /// Default location, `<config dir>/totem-subtitles/settings.json`
    pub fn default_path() -> Result<PathBuf> {
        ProjectDirs::from("org", "gnome", "totem-subtitles")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .ok_or_else(|| SubtitleError::InvalidConfiguration("no home directory found".to_string()))
    }

    /// Load settings from `path`
    ///
    /// A missing file yields the defaults. A file that does not parse, or
    /// names a language the service does not know, is an error.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
            SubtitleError::InvalidConfiguration(format!("{}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path`, creating the parent directory
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, path).await?;

        info!(path = %path.display(), language = %self.language, "Saved settings");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !language::is_supported(&self.language) {
            return Err(SubtitleError::InvalidConfiguration(format!(
                "unknown subtitle language '{}'",
                self.language
            )));
        }
        Ok(())
    }
}
