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

//! Host-facing plugin surface
//!
//! A media player embeds [`SubtitlePlugin`] and implements [`MediaHost`] for
//! it. The plugin never blocks the caller: searches and downloads are
//! dispatched on a [`TaskRunner`] and the host drives them to completion from
//! a timer with [`SubtitlePlugin::poll_search`] and
//! [`SubtitlePlugin::poll_download`].
//!
//! # Flow
//! 1. `is_available()` decides whether the "download subtitles" action is enabled
//! 2. `search_for_current_media()` fingerprints the file and searches
//! 3. `poll_search()` until it returns `false`, then show `results()`
//! 4. `download_and_apply(&result)` for the row the user picked
//! 5. `poll_download()` until it returns `false`; the subtitle is saved and
//!    handed to the host with `set_subtitle_uri`

use crate::api::client::OpenSubtitlesClient;
use crate::api::models::{filter_allowed, SearchResult};
use crate::api::search::SearchCoordinator;
use crate::api::session::SubtitleSession;
use crate::api::transport::SubtitleTransport;
use crate::config::Settings;
use crate::download::DownloadCoordinator;
use crate::error::{Result, SubtitleError};
use crate::file::{Fingerprint, SubtitleStore};
use crate::language;
use crate::task::{TaskHandle, TaskPoll, TaskRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// URI schemes that never get subtitles (discs, broadcasts, streams)
pub const BLOCKED_SCHEMES: [&str; 4] = ["dvd", "http", "dvb", "vcd"];

/// File extensions treated as audio-only media
const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "ape", "au", "flac", "m4a", "m4b", "mka", "mp2", "mp3", "mpc", "oga",
    "ogg", "opus", "ra", "spx", "wav", "wma", "wv",
];

/// What the plugin needs from the media player
pub trait MediaHost: Send + Sync {
    /// Location of the playing media, `None` when nothing is loaded
    fn current_mrl(&self) -> Option<String>;

    /// Short title of the playing media, used for the title search
    fn current_title(&self) -> Option<String>;

    /// Load the subtitle at `uri` for the playing media
    fn set_subtitle_uri(&self, uri: &str);

    /// Show a status message to the user
    fn notify(&self, message: &str);
}

/// Whether subtitles can be offered for `mrl`
///
/// Mirrors the menu sensitivity check: the scheme must not be a disc or
/// stream scheme and the file must not look like audio.
pub fn is_eligible(mrl: &str) -> bool {
    let blocked = scheme_of(mrl)
        .map(|scheme| BLOCKED_SCHEMES.contains(&scheme.as_str()))
        .unwrap_or(false);

    !blocked && !is_audio(mrl)
}

/// Local file path for `mrl`
///
/// Accepts `file://` URIs and plain absolute paths.
///
/// # Errors
/// - `UnsupportedMedia` for blocked schemes, audio files and remote locations
/// - `InvalidPath` if a `file://` URI does not map to a local path
pub fn media_path(mrl: &str) -> Result<PathBuf> {
    if !is_eligible(mrl) {
        return Err(SubtitleError::UnsupportedMedia(mrl.to_string()));
    }

    match Url::parse(mrl) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| SubtitleError::InvalidPath(mrl.to_string())),
        Ok(url) if url.scheme().len() > 1 => Err(SubtitleError::UnsupportedMedia(format!(
            "{} ({} locations cannot be fingerprinted)",
            mrl,
            url.scheme()
        ))),
        // Plain paths, including Windows drive letters parsed as a scheme
        _ => {
            let path = PathBuf::from(mrl);
            if path.is_absolute() {
                Ok(path)
            } else {
                Err(SubtitleError::InvalidPath(mrl.to_string()))
            }
        }
    }
}

fn scheme_of(mrl: &str) -> Option<String> {
    Url::parse(mrl).ok().map(|url| url.scheme().to_string())
}

fn is_audio(mrl: &str) -> bool {
    let name = match Url::parse(mrl) {
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        _ => mrl.to_string(),
    };

    Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Subtitle search and download for the host's current media
pub struct SubtitlePlugin<H: MediaHost> {
    host: Arc<H>,
    session: Arc<SubtitleSession>,
    search: SearchCoordinator,
    download: DownloadCoordinator,
    store: SubtitleStore,
    runner: TaskRunner,
    settings_path: Option<PathBuf>,
    media: Option<PathBuf>,
    results: Vec<SearchResult>,
    pending_search: Option<TaskHandle<Vec<SearchResult>>>,
    pending_download: Option<TaskHandle<PathBuf>>,
}

impl<H: MediaHost + 'static> SubtitlePlugin<H> {
    /// Create a plugin over an existing transport
    pub fn new(
        host: Arc<H>,
        transport: Arc<dyn SubtitleTransport>,
        settings: Settings,
        store: SubtitleStore,
        runner: TaskRunner,
    ) -> Self {
        let session = Arc::new(SubtitleSession::new(
            transport,
            settings.language,
            crate::api::client::DEFAULT_USER_AGENT,
        ));

        Self {
            host,
            search: SearchCoordinator::new(Arc::clone(&session)),
            download: DownloadCoordinator::new(Arc::clone(&session)),
            session,
            store,
            runner,
            settings_path: None,
            media: None,
            results: Vec::new(),
            pending_search: None,
            pending_download: None,
        }
    }

    /// Create a plugin with the default client, settings file and cache
    ///
    /// Must be called from within a tokio runtime.
    pub async fn with_defaults(host: Arc<H>) -> Result<Self> {
        let settings_path = Settings::default_path()?;
        let settings = Settings::load(&settings_path).await?;
        let transport = Arc::new(OpenSubtitlesClient::new()?);

        let plugin = Self::new(
            host,
            transport,
            settings,
            SubtitleStore::with_default_cache()?,
            TaskRunner::current()?,
        );
        Ok(plugin.with_settings_path(settings_path))
    }

    /// Persist language changes to `path`
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    /// Whether the download action should be enabled for the current media
    pub fn is_available(&self) -> bool {
        self.host
            .current_mrl()
            .map(|mrl| is_eligible(&mrl))
            .unwrap_or(false)
    }

    /// Results of the last finished search, allow-listed formats only
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.pending_search.is_some()
    }

    pub fn is_downloading(&self) -> bool {
        self.pending_download.is_some()
    }

    /// Start a search for the host's current media
    ///
    /// # Errors
    /// `NoCurrentMedia`, `UnsupportedMedia` or `InvalidPath` when the media
    /// cannot be searched; remote errors arrive through [`Self::poll_search`].
    pub fn search_for_current_media(&mut self) -> Result<()> {
        let mrl = self.host.current_mrl().ok_or(SubtitleError::NoCurrentMedia)?;
        let path = media_path(&mrl)?;
        let title = self.host.current_title().unwrap_or_default();

        info!(media = %path.display(), title = %title, "Searching subtitles");
        self.results.clear();

        let search = self.search.clone();
        let fingerprint_path = path.clone();
        let handle = self.runner.dispatch("search", async move {
            let fingerprint = tokio::task::spawn_blocking(move || Fingerprint::compute(fingerprint_path))
                .await
                .map_err(|e| SubtitleError::TaskFailed(e.to_string()))??;
            debug!(hash = %fingerprint, size = fingerprint.size(), "Fingerprinted media");

            let results = search.search(&fingerprint, &title).await?;
            Ok(filter_allowed(&results))
        });

        self.media = Some(path);
        self.pending_search = Some(handle);
        Ok(())
    }

    /// Timer callback for a running search
    ///
    /// Returns `true` while the search is still running. On failure the
    /// message is passed to [`MediaHost::notify`].
    pub fn poll_search(&mut self) -> bool {
        let poll = match &self.pending_search {
            Some(handle) => handle.poll(),
            None => return false,
        };

        match poll {
            TaskPoll::NotReady => true,
            TaskPoll::Finished(outcome) => {
                self.pending_search = None;
                match outcome {
                    Ok(results) => {
                        debug!(count = results.len(), "Search finished");
                        self.results = results;
                    }
                    Err(message) => {
                        self.results.clear();
                        self.host.notify(&message);
                    }
                }
                false
            }
        }
    }

    /// Host callback for a newly opened file
    ///
    /// Results and pending work of the previous media are dropped.
    pub fn on_media_changed(&mut self) {
        debug!("Media changed");
        self.forget_media();
    }

    /// Host callback for the playing file being closed
    pub fn on_media_closed(&mut self) {
        debug!("Media closed");
        self.forget_media();
    }

    fn forget_media(&mut self) {
        if self.pending_search.is_some() || self.pending_download.is_some() {
            debug!("Dropping pending subtitle work for the previous media");
        }
        self.media = None;
        self.results.clear();
        self.pending_search = None;
        self.pending_download = None;
    }

    /// Start downloading `result` for the media of the last search
    ///
    /// # Errors
    /// - `InvalidPath` if the result's format is not an allow-listed extension
    /// - `NoCurrentMedia` if no search was started or the host now plays
    ///   other media; stale results are dropped in that case
    pub fn download_and_apply(&mut self, result: &SearchResult) -> Result<()> {
        if !result.has_allowed_format() {
            return Err(SubtitleError::InvalidPath(format!(
                "'{}' is not a subtitle file extension",
                result.format
            )));
        }

        let media = self.media.clone().ok_or(SubtitleError::NoCurrentMedia)?;
        let still_playing = self
            .host
            .current_mrl()
            .and_then(|mrl| media_path(&mrl).ok())
            .map(|current| current == media)
            .unwrap_or(false);
        if !still_playing {
            warn!(media = %media.display(), "Search results belong to media that is no longer playing");
            self.forget_media();
            return Err(SubtitleError::NoCurrentMedia);
        }

        info!(subtitle_id = %result.remote_id, format = %result.format, "Downloading subtitle");

        let download = self.download.clone();
        let store = self.store.clone();
        let subtitle_id = result.remote_id.clone();
        let format = result.format.clone();
        let handle = self.runner.dispatch("download", async move {
            let subtitle = download.download(&subtitle_id).await?;
            store.save(&media, &format, &subtitle.content).await
        });

        self.pending_download = Some(handle);
        Ok(())
    }

    /// Timer callback for a running download
    ///
    /// Returns `true` while the download is still running. When it finished
    /// the saved file is applied with [`MediaHost::set_subtitle_uri`].
    pub fn poll_download(&mut self) -> bool {
        let poll = match &self.pending_download {
            Some(handle) => handle.poll(),
            None => return false,
        };

        match poll {
            TaskPoll::NotReady => true,
            TaskPoll::Finished(outcome) => {
                self.pending_download = None;
                match outcome {
                    Ok(path) => match Url::from_file_path(&path) {
                        Ok(uri) => {
                            info!(uri = %uri, "Applying subtitle");
                            self.host.set_subtitle_uri(uri.as_str());
                        }
                        Err(()) => {
                            warn!(path = %path.display(), "Saved subtitle path is not absolute");
                            self.host
                                .notify(&SubtitleError::InvalidPath(path.display().to_string()).user_message());
                        }
                    },
                    Err(message) => self.host.notify(&message),
                }
                false
            }
        }
    }

    /// Current subtitle language (service code)
    pub async fn language(&self) -> String {
        self.session.language().await
    }

    /// Switch the subtitle language and persist the choice
    ///
    /// # Errors
    /// `InvalidConfiguration` if `code` is not a known service code.
    pub async fn set_language(&self, code: &str) -> Result<()> {
        if !language::is_supported(code) {
            return Err(SubtitleError::InvalidConfiguration(format!(
                "unknown subtitle language '{}'",
                code
            )));
        }

        self.session.set_language(code).await;

        if let Some(path) = &self.settings_path {
            let settings = Settings {
                language: code.to_string(),
            };
            settings.save(path).await?;
        }

        Ok(())
    }
}
