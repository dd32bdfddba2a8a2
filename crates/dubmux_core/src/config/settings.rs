//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::subtitles::RoundingMode;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Reconciliation and encode settings.
    #[serde(default)]
    pub assembly: AssemblySettings,

    /// Caption rendering settings.
    #[serde(default)]
    pub subtitles: SubtitleSettings,

    /// Thumbnail extraction settings.
    #[serde(default)]
    pub thumbnail: ThumbnailSettings,

    /// Job queue sizing.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for temp and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for per-job working directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Locations of ffmpeg and ffprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (bare name = search PATH).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable (bare name = search PATH).
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Seconds before a probe is killed and treated as failed (10-120).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_probe_timeout() -> u64 {
    30
}

impl ToolSettings {
    pub const MIN_PROBE_TIMEOUT_SECS: u64 = 10;
    pub const MAX_PROBE_TIMEOUT_SECS: u64 = 120;

    /// Probe timeout clamped to the supported range.
    pub fn probe_timeout(&self) -> std::time::Duration {
        let secs = self
            .probe_timeout_secs
            .clamp(Self::MIN_PROBE_TIMEOUT_SECS, Self::MAX_PROBE_TIMEOUT_SECS);
        std::time::Duration::from_secs(secs)
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

/// Reconciliation, fallback, and encode parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// Durations closer than this (seconds) leave the narration untouched.
    #[serde(default = "default_desync_tolerance")]
    pub desync_tolerance: f64,

    /// Narration sample rate when the caller does not give one.
    #[serde(default = "default_sample_rate")]
    pub default_sample_rate: u32,

    /// Video duration used when a standalone merge cannot probe the source.
    #[serde(default = "default_merge_fallback_duration")]
    pub merge_fallback_duration: f64,

    /// Video duration used when the narration pipeline cannot probe the source.
    #[serde(default = "default_narrated_fallback_duration")]
    pub narrated_fallback_duration: f64,

    /// Frame width used when dimensions cannot be probed.
    #[serde(default = "default_fallback_width")]
    pub fallback_width: u32,

    /// Frame height used when dimensions cannot be probed.
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,

    /// Audio codec for the base mux.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Video codec when burning captions.
    #[serde(default = "default_video_codec")]
    pub burn_video_codec: String,

    /// Encoder preset when burning captions.
    #[serde(default = "default_preset")]
    pub burn_preset: String,

    /// Minimum burn progress advance forwarded to subscribers.
    #[serde(default = "default_progress_step")]
    pub progress_step: f64,
}

fn default_desync_tolerance() -> f64 {
    0.5
}

fn default_sample_rate() -> u32 {
    24_000
}

fn default_merge_fallback_duration() -> f64 {
    10.0
}

fn default_narrated_fallback_duration() -> f64 {
    15.0
}

fn default_fallback_width() -> u32 {
    1080
}

fn default_fallback_height() -> u32 {
    1920
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_progress_step() -> f64 {
    0.05
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            desync_tolerance: default_desync_tolerance(),
            default_sample_rate: default_sample_rate(),
            merge_fallback_duration: default_merge_fallback_duration(),
            narrated_fallback_duration: default_narrated_fallback_duration(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
            audio_codec: default_audio_codec(),
            burn_video_codec: default_video_codec(),
            burn_preset: default_preset(),
            progress_step: default_progress_step(),
        }
    }
}

/// Caption rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleSettings {
    /// Font family for every caption.
    #[serde(default = "default_font_name")]
    pub font_name: String,

    /// Directory handed to the renderer as `fontsdir` (empty = system fonts).
    #[serde(default)]
    pub fonts_dir: String,

    /// Rounding of caption times to centiseconds.
    #[serde(default)]
    pub rounding: RoundingMode,
}

fn default_font_name() -> String {
    "FC Iconic".to_string()
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            fonts_dir: String::new(),
            rounding: RoundingMode::default(),
        }
    }
}

/// Thumbnail extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailSettings {
    /// Generate a thumbnail at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_thumb_width")]
    pub width: u32,

    #[serde(default = "default_thumb_height")]
    pub height: u32,

    /// Seek offset of the captured frame in seconds.
    #[serde(default = "default_thumb_offset")]
    pub offset_secs: f64,

    /// Encoder quality (`-q:v`).
    #[serde(default = "default_thumb_quality")]
    pub quality: u32,

    /// Output image extension.
    #[serde(default = "default_thumb_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_thumb_width() -> u32 {
    270
}

fn default_thumb_height() -> u32 {
    480
}

fn default_thumb_offset() -> f64 {
    0.1
}

fn default_thumb_quality() -> u32 {
    80
}

fn default_thumb_format() -> String {
    "webp".to_string()
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            width: default_thumb_width(),
            height: default_thumb_height(),
            offset_secs: default_thumb_offset(),
            quality: default_thumb_quality(),
            format: default_thumb_format(),
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Number of jobs assembled concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs that may wait before `try_submit` reports the queue as full.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_workers() -> usize {
    2
}

fn default_capacity() -> usize {
    16
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            capacity: default_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage in the job log.
    #[serde(default = "default_log_progress_step")]
    pub progress_step: u32,

    /// Default level for the global subscriber when RUST_LOG is unset.
    #[serde(default)]
    pub level: LogLevel,
}

fn default_error_tail() -> u32 {
    20
}

fn default_log_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_log_progress_step(),
            level: LogLevel::default(),
        }
    }
}

impl LoggingSettings {
    /// Per-job logger configuration derived from these settings.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step.max(1),
            error_tail: self.error_tail as usize,
            ..LogConfig::default()
        }
    }
}

/// Config sections that can be updated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Assembly,
    Subtitles,
    Thumbnail,
    Queue,
    Logging,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Assembly,
        ConfigSection::Subtitles,
        ConfigSection::Thumbnail,
        ConfigSection::Queue,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Assembly => "assembly",
            ConfigSection::Subtitles => "subtitles",
            ConfigSection::Thumbnail => "thumbnail",
            ConfigSection::Queue => "queue",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Working and log directories",
            ConfigSection::Tools => "External tools",
            ConfigSection::Assembly => "Duration reconciliation and encoding",
            ConfigSection::Subtitles => "Caption rendering",
            ConfigSection::Thumbnail => "Thumbnail extraction",
            ConfigSection::Queue => "Concurrent job processing",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}
