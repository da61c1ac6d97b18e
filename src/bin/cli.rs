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

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use subtitles_core::api::client::{ClientConfig, DEFAULT_ENDPOINT};
use subtitles_core::api::filter_allowed;
use subtitles_core::{
    language, logging, DownloadCoordinator, Fingerprint, OpenSubtitlesClient, SearchCoordinator,
    Settings, SubtitleSession, SubtitleStore,
};

#[derive(Parser)]
#[command(name = "subfetch-cli")]
#[command(about = "Subtitle lookup CLI - Desktop testing tool", long_about = None)]
#[command(version = subtitles_core::version())]
struct Cli {
    /// XML-RPC endpoint
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Increase log output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of a movie file
    Hash {
        /// Movie file
        file: PathBuf,
    },
    /// Search subtitles for a movie file
    Search {
        /// Movie file
        file: PathBuf,
        /// Title used when the fingerprint finds nothing (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
        /// Subtitle language, 3-letter service code (defaults to the saved setting)
        #[arg(short, long)]
        language: Option<String>,
        /// Also list formats the player cannot load
        #[arg(long)]
        all: bool,
    },
    /// Download a subtitle by id
    Download {
        /// Subtitle file id from `search`
        id: String,
        /// Save next to this movie file instead of printing
        #[arg(short, long)]
        media: Option<PathBuf>,
        /// Subtitle format used for the saved file name
        #[arg(short, long, default_value = "srt")]
        format: String,
    },
    /// List supported subtitle languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::level_for_verbosity(cli.verbose));

    match cli.command {
        Commands::Hash { file } => {
            let fingerprint = Fingerprint::compute(&file)
                .with_context(|| format!("Could not fingerprint {}", file.display()))?;
            println!("{}  {} bytes  {}", fingerprint, fingerprint.size(), file.display());
        }
        Commands::Search {
            file,
            title,
            language,
            all,
        } => {
            let fingerprint = Fingerprint::compute(&file)
                .with_context(|| format!("Could not fingerprint {}", file.display()))?;
            let language = match language {
                Some(code) => code,
                None => load_settings().await?.language,
            };
            if !language::is_supported(&language) {
                bail!("Unknown language code '{}', see `languages`", language);
            }
            let title = title.unwrap_or_else(|| title_from_file(&file));

            let session = connect(&cli.endpoint, &language)?;
            let results = SearchCoordinator::new(session)
                .search(&fingerprint, &title)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let results = if all { results } else { filter_allowed(&results) };

            println!("{:<12} {:<6} {:<6} FILE", "ID", "FORMAT", "RATING");
            for result in &results {
                println!(
                    "{:<12} {:<6} {:<6} {}",
                    result.remote_id, result.format, result.rating, result.file_name
                );
            }
        }
        Commands::Download { id, media, format } => {
            let language = load_settings().await?.language;
            let session = connect(&cli.endpoint, &language)?;
            let subtitle = DownloadCoordinator::new(session)
                .download(&id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            match media {
                Some(media) => {
                    let store = SubtitleStore::with_default_cache()?;
                    let path = store.save(&media, &format, &subtitle.content).await?;
                    println!("Saved {}", path.display());
                }
                None => {
                    std::io::stdout().write_all(&subtitle.content)?;
                }
            }
        }
        Commands::Languages => {
            for language in language::sorted_by_name() {
                println!("{}  {:<3}  {}", language.code, language.iso, language.name);
            }
        }
    }

    Ok(())
}

fn connect(endpoint: &str, language: &str) -> Result<Arc<SubtitleSession>> {
    let config = ClientConfig::builder().endpoint(endpoint).build();
    let user_agent = config.user_agent.clone();
    let client = OpenSubtitlesClient::with_config(config)?;

    Ok(Arc::new(SubtitleSession::new(Arc::new(client), language, user_agent)))
}

async fn load_settings() -> Result<Settings> {
    let path = Settings::default_path()?;
    Ok(Settings::load(&path).await?)
}

fn title_from_file(file: &std::path::Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['.', '_'], " "))
        .unwrap_or_default()
}
