//! `vox`: command-line host for the VOX phrase engine.
//!
//! Loads settings, makes sure the clip directory is populated, and exposes
//! phrase building, listing and cache control as subcommands.

mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vox_core::{
    config::MAX_SILENCE_MS, phrase::resolve_clips, ClipRef, ConcatEngine, PhraseDefinition, VoxConfig, VoxService,
};

use settings::{default_settings_path, load_settings, save_settings};

#[derive(Debug, Parser)]
#[command(name = "vox")]
#[command(about = "Half-Life style VOX announcements from pre-recorded clips")]
struct Cli {
    /// Settings file (JSON). Defaults to the platform data directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a configured phrase (cached).
    Play {
        phrase_id: String,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Render an ad-hoc clip sequence without touching the cache.
    Build {
        #[arg(required = true)]
        clips: Vec<String>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_SILENCE_MS as i64))]
        silence_ms: Option<u32>,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List configured phrases.
    List,
    /// Download the clip archive if the sounds directory is empty.
    Fetch,
    /// Remove cached audio for one phrase, or all of them.
    ClearCache { phrase_id: Option<String> },
    /// Define or replace a phrase and save it to the settings file.
    AddPhrase {
        phrase_id: String,
        #[arg(required = true)]
        clips: Vec<String>,
    },
    /// Remove a phrase from the settings file.
    RemovePhrase { phrase_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let config = load_settings(&settings_path);
    info!(settings = %settings_path.display(), "settings loaded");

    match cli.command {
        Command::Play { phrase_id, out } => {
            let service = start_service(config).await?;
            let bytes = match service.phrase_audio_async(phrase_id.clone()).await {
                Ok(b) => b,
                Err(e) => {
                    bail!("{} ({}): {e}", e.public_message(), e.status_code());
                }
            };
            write_output(out, &bytes)?;
        }
        Command::Build {
            clips,
            silence_ms,
            out,
        } => {
            let clips: Vec<ClipRef> = clips.into_iter().map(ClipRef::new).collect();
            let paths = resolve_clips(&clips, &config.sounds_dir)?;
            ConcatEngine::default()
                .build_to_file(&paths, silence_ms.unwrap_or(config.silence_ms), &out)
                .with_context(|| format!("failed to build {}", out.display()))?;
            info!(out = %out.display(), "phrase written");
        }
        Command::List => {
            let service = VoxService::new(config)?;
            let mut stdout = std::io::stdout().lock();
            for media in service.browse() {
                let cached = if service.cache_entry(&media.id).is_some() {
                    "cached"
                } else {
                    "-"
                };
                writeln!(stdout, "{:<32} {:<40} {cached}", media.id, media.title)?;
            }
        }
        Command::Fetch => {
            let service = start_service(config).await?;
            info!(dir = %service.config().sounds_dir.display(), "sounds ready");
        }
        Command::ClearCache { phrase_id } => {
            let service = VoxService::new(config)?;
            match phrase_id {
                Some(id) => service.invalidate_phrase(&id)?,
                None => service.invalidate_all_phrases()?,
            }
        }
        Command::AddPhrase { phrase_id, clips } => {
            let def = PhraseDefinition::new(
                phrase_id.clone(),
                clips.into_iter().map(ClipRef::new).collect(),
            )?;
            let mut config = config;
            config
                .phrases
                .insert(phrase_id.clone(), def.clips().to_vec());
            save_settings(&settings_path, &config)?;
            VoxService::new(config)?.invalidate_phrase(&phrase_id)?;
            info!(phrase_id = %phrase_id, "phrase saved");
        }
        Command::RemovePhrase { phrase_id } => {
            let mut config = config;
            if config.phrases.remove(&phrase_id).is_none() {
                bail!("unknown phrase: {phrase_id}");
            }
            save_settings(&settings_path, &config)?;
            VoxService::new(config)?.invalidate_phrase(&phrase_id)?;
            info!(phrase_id = %phrase_id, "phrase removed");
        }
    }

    Ok(())
}

/// Build the service and make sure clips are available.
async fn start_service(config: VoxConfig) -> Result<Arc<VoxService>> {
    let deadline = config.fetch_timeout() + Duration::from_secs(30);
    let service = Arc::new(VoxService::new(config)?);
    if !service.ensure_assets_async(deadline).await {
        warn!(
            dir = %service.config().sounds_dir.display(),
            "no VOX clips available; set soundsDir or enable autoFetch"
        );
    }
    Ok(service)
}

fn write_output(out: Option<PathBuf>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => {
            vox_core::persist::write_atomic(&path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(out = %path.display(), bytes = bytes.len(), "phrase written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
