//! Subtitle lookup for media players
//!
//! Fingerprints a local movie file, searches OpenSubtitles by fingerprint with
//! a title fallback, and downloads the chosen subtitle. Network work runs in
//! the background and is polled from the host's UI loop.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod file;
pub mod language;
pub mod logging;
pub mod plugin;
pub mod task;

pub use api::{OpenSubtitlesClient, SearchCoordinator, SearchResult, SubtitleSession, SubtitleTransport};
pub use config::Settings;
pub use download::{DownloadCoordinator, DownloadedSubtitle};
pub use error::{Result, SubtitleError};
pub use file::{Fingerprint, SubtitleStore};
pub use plugin::{MediaHost, SubtitlePlugin};
pub use task::{TaskHandle, TaskPoll, TaskRunner};

/// Crate version, reported by the CLI
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
