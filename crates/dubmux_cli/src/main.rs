//! dubmux CLI
//!
//! Command-line front end for assembling dubbed short-form videos.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dubmux_core::captions::{parse_srt_segments, segment_captions};
use dubmux_core::config::{ConfigManager, Settings};
use dubmux_core::logging::{init_tracing, init_tracing_with_file};
use dubmux_core::media::{FfmpegToolkit, MediaToolkit, ToolResult};
use dubmux_core::models::{AssemblyRequest, CaptionSource, JobKind, MediaAsset, NarrationAsset};
use dubmux_core::orchestrator::{Assembler, CancelHandle, ProgressEvent, ProgressSubscriber};
use dubmux_core::subtitles::build_descriptor;

const DEFAULT_CONFIG: &str = "dubmux.toml";

#[derive(Parser)]
#[command(name = "dubmux")]
#[command(about = "Merge narration onto short-form video, with optional burned-in captions")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./dubmux.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a narration track onto a video
    Merge {
        /// Source video file
        #[arg(long)]
        video: PathBuf,

        /// Raw PCM narration (signed 16-bit little-endian mono)
        #[arg(long)]
        narration: PathBuf,

        /// Narration sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// SRT transcript to burn in as captions
        #[arg(long)]
        captions: Option<PathBuf>,

        /// Narration script, used as context for caption correction
        #[arg(long)]
        script: Option<PathBuf>,

        /// Where to write the final video
        #[arg(short, long)]
        out: PathBuf,

        /// Where to write the thumbnail, if one is produced
        #[arg(long)]
        thumbnail: Option<PathBuf>,

        /// Treat the job as part of the narrated pipeline
        #[arg(long)]
        narrated: bool,
    },

    /// Print the ASS subtitle document for an SRT transcript
    Captions {
        /// SRT transcript
        #[arg(long)]
        srt: PathBuf,

        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        #[arg(long, default_value = "1080")]
        width: u32,

        #[arg(long, default_value = "1920")]
        height: u32,
    },

    /// Check that ffmpeg and ffprobe can be run
    Health,

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file with defaults (existing values are kept)
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config {
        action: ConfigAction::Init { path },
    } = &cli.command
    {
        return init_config(path);
    }

    let settings = load_settings(cli.config.as_deref())?;

    // Only jobs keep a log file; the guard flushes it when main returns.
    let _log_guard = if matches!(cli.command, Commands::Merge { .. }) {
        let logs_folder = Path::new(&settings.paths.logs_folder);
        fs::create_dir_all(logs_folder)
            .with_context(|| format!("Failed to create logs folder {}", logs_folder.display()))?;
        Some(init_tracing_with_file(settings.logging.level, logs_folder))
    } else {
        init_tracing(settings.logging.level);
        None
    };

    match cli.command {
        Commands::Merge {
            video,
            narration,
            sample_rate,
            captions,
            script,
            out,
            thumbnail,
            narrated,
        } => {
            let sample_rate = sample_rate.unwrap_or(settings.assembly.default_sample_rate);
            let narration = NarrationAsset::from_file(&narration, sample_rate)
                .with_context(|| format!("Failed to read narration {}", narration.display()))?;
            let mut request = AssemblyRequest::new(MediaAsset::from_file(video), narration);
            if narrated {
                request = request.with_kind(JobKind::Narrated);
            }
            if let Some(path) = captions {
                request = request.with_captions(CaptionSource::Srt(read_text(&path)?));
            }
            if let Some(path) = script {
                request = request.with_script(read_text(&path)?);
            }
            merge(settings, request, &out, thumbnail.as_deref())?
        }

        Commands::Captions {
            srt,
            duration,
            width,
            height,
        } => print_captions(&settings, &srt, duration, width, height)?,

        Commands::Health => health(&settings)?,

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG).exists() => PathBuf::from(DEFAULT_CONFIG),
        None => return Ok(Settings::default()),
    };
    let mut manager = ConfigManager::new(&path);
    manager
        .load()
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    Ok(manager.into_settings())
}

fn init_config(path: &Path) -> Result<()> {
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn merge(
    settings: Settings,
    request: AssemblyRequest,
    out: &Path,
    thumbnail: Option<&Path>,
) -> Result<()> {
    fs::create_dir_all(&settings.paths.temp_root).context("Failed to create temp folder")?;
    let toolkit = Arc::new(FfmpegToolkit::from_settings(&settings.tools));
    let assembler = Assembler::new(settings, toolkit);

    let subscriber: ProgressSubscriber = Box::new(|event: ProgressEvent| {
        eprintln!("[{:>3.0}%] {}", event.fraction * 100.0, event.label);
    });
    let job_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("Starting job {}", job_id);
    let job = assembler.assemble(&job_id, request, &CancelHandle::new(), Some(subscriber));

    let mut thumbnail_written = None;
    if let Some(ref result) = job.result {
        fs::write(out, &result.bytes)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        if let (Some(path), Some(bytes)) = (thumbnail, job.thumbnail.as_ref()) {
            fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            thumbnail_written = Some(path.display().to_string());
        }
    }

    let summary = serde_json::json!({
        "success": job.is_done(),
        "job_id": job.job_id,
        "duration": job.duration,
        "video_duration": job.video_duration(),
        "video_size": job.result.as_ref().map(|r| r.size),
        "source": job.result.as_ref().map(|r| r.source),
        "thumbnail": thumbnail_written,
        "degraded": job.steps_degraded,
        "error": job.error,
        "error_kind": job.error_kind,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !job.is_done() {
        bail!(
            "Job {} failed: {}",
            job.job_id,
            job.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_captions(
    settings: &Settings,
    srt: &Path,
    duration: f64,
    width: u32,
    height: u32,
) -> Result<()> {
    print!("{}", caption_document(settings, &read_text(srt)?, duration, width, height)?);
    Ok(())
}

/// Normalized ASS document for an SRT transcript. An empty timeline still
/// yields a valid header-only document.
fn caption_document(
    settings: &Settings,
    srt: &str,
    duration: f64,
    width: u32,
    height: u32,
) -> Result<String> {
    let segments = parse_srt_segments(srt).context("Invalid SRT transcript")?;
    let timeline = segment_captions(&segments, duration).context("Failed to segment captions")?;
    if timeline.is_empty() {
        tracing::warn!("No captions fall inside a {}s video", duration);
    }
    let descriptor = build_descriptor(&timeline, width, height, &settings.subtitles.font_name)
        .with_rounding(settings.subtitles.rounding);
    Ok(descriptor.to_ass())
}

fn health(settings: &Settings) -> Result<()> {
    let toolkit = FfmpegToolkit::from_settings(&settings.tools);
    let ffmpeg = toolkit.version();
    let ffprobe = toolkit.probe_version();

    let status = |result: &ToolResult<String>| match result {
        Ok(version) => serde_json::json!({ "ok": true, "version": version }),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    };
    let report = serde_json::json!({
        "ffmpeg": status(&ffmpeg),
        "ffprobe": status(&ffprobe),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if ffmpeg.is_err() || ffprobe.is_err() {
        bail!("Media tools are not available");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captions_past_the_video_give_header_only_document() {
        let srt = "1\n00:00:20,000 --> 00:00:21,000\nlate\n";
        let ass = caption_document(&Settings::default(), srt, 10.0, 1080, 1920).unwrap();

        assert!(ass.starts_with("[Script Info]\n"));
        assert!(ass.contains("[V4+ Styles]\n"));
        assert!(ass.contains("[Events]\n"));
        assert!(!ass.contains("Dialogue:"));
    }

    #[test]
    fn captions_are_rendered_as_dialogue() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nhello\n";
        let ass = caption_document(&Settings::default(), srt, 10.0, 1080, 1920).unwrap();
        assert_eq!(ass.lines().filter(|l| l.starts_with("Dialogue:")).count(), 1);
    }

    #[test]
    fn malformed_transcript_is_an_error() {
        let srt = "1\n00:00:xx,000 --> 00:00:02,000\nbroken\n";
        assert!(caption_document(&Settings::default(), srt, 10.0, 1080, 1920).is_err());
    }
}
