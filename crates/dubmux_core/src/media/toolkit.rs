//! The media toolkit seam.
//!
//! Every external process the pipeline needs goes through [`MediaToolkit`].
//! Production code uses `FfmpegToolkit`; tests substitute a scripted fake.

use std::path::{Path, PathBuf};

use crate::models::{MediaInfo, PcmFormat};

use super::error::ToolResult;

/// Inputs of the base mux: source video stream + reconciled narration.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxRequest {
    pub video: PathBuf,
    pub audio: PathBuf,
    /// Output duration in seconds (the source video duration).
    pub duration: f64,
    pub audio_codec: String,
    pub output: PathBuf,
}

/// Inputs of the subtitle burn.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnRequest {
    pub input: PathBuf,
    pub subtitles: PathBuf,
    pub fonts_dir: Option<PathBuf>,
    pub video_codec: String,
    pub preset: String,
    pub output: PathBuf,
}

/// Inputs of the thumbnail capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    pub input: PathBuf,
    pub width: u32,
    pub height: u32,
    pub offset_secs: f64,
    pub quality: u32,
    pub output: PathBuf,
}

/// Operations on media files backed by external tools.
///
/// Implementations must be shareable across worker threads.
pub trait MediaToolkit: Send + Sync {
    /// Read duration and video dimensions.
    fn probe(&self, path: &Path) -> ToolResult<MediaInfo>;

    /// Wrap raw PCM into a WAV file.
    fn pcm_to_wav(&self, pcm: &Path, format: PcmFormat, output: &Path) -> ToolResult<()>;

    /// Append `seconds` of silence.
    fn pad_audio(&self, input: &Path, seconds: f64, output: &Path) -> ToolResult<()>;

    /// Cut to exactly `duration` seconds from the start.
    fn trim_audio(&self, input: &Path, duration: f64, output: &Path) -> ToolResult<()>;

    /// Copy the video stream and encode the narration as the only audio.
    fn mux(&self, request: &MuxRequest) -> ToolResult<()>;

    /// Re-encode with captions burned in.
    ///
    /// `on_progress` receives elapsed output time in seconds as the encoder
    /// reports it. Values are not filtered.
    fn burn_subtitles(
        &self,
        request: &BurnRequest,
        on_progress: &mut dyn FnMut(f64),
    ) -> ToolResult<()>;

    /// Capture one frame as a still image.
    fn thumbnail(&self, request: &ThumbnailRequest) -> ToolResult<()>;

    /// Tool version string (health check).
    fn version(&self) -> ToolResult<String>;
}
