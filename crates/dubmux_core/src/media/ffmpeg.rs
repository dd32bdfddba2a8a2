//! `MediaToolkit` backed by the ffmpeg and ffprobe executables.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde_json::Value;

use crate::config::ToolSettings;
use crate::models::{MediaInfo, PcmFormat};

use super::error::{ToolError, ToolResult};
use super::process::{run, run_streaming, run_with_timeout};
use super::progress::parse_progress_line;
use super::toolkit::{BurnRequest, MediaToolkit, MuxRequest, ThumbnailRequest};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Toolkit invoking ffmpeg/ffprobe as child processes.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    probe_timeout: Duration,
}

impl FfmpegToolkit {
    /// Use `ffmpeg`/`ffprobe` from PATH with a 30s probe timeout.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG),
            ffprobe: PathBuf::from(FFPROBE),
            probe_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            ffmpeg: PathBuf::from(&settings.ffmpeg_path),
            ffprobe: PathBuf::from(&settings.ffprobe_path),
            probe_timeout: settings.probe_timeout(),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Version line of the configured ffprobe.
    pub fn probe_version(&self) -> ToolResult<String> {
        tool_version(&self.ffprobe, FFPROBE, self.probe_timeout)
    }

    fn ffmpeg(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args);
        cmd
    }
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn probe(&self, path: &Path) -> ToolResult<MediaInfo> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(probe_args(path));
        let stdout = run_with_timeout(&mut cmd, FFPROBE, self.probe_timeout)?;
        parse_probe_json(&stdout)
    }

    fn pcm_to_wav(&self, pcm: &Path, format: PcmFormat, output: &Path) -> ToolResult<()> {
        run(&mut self.ffmpeg(pcm_to_wav_args(pcm, format, output)), FFMPEG)?;
        Ok(())
    }

    fn pad_audio(&self, input: &Path, seconds: f64, output: &Path) -> ToolResult<()> {
        run(&mut self.ffmpeg(pad_args(input, seconds, output)), FFMPEG)?;
        Ok(())
    }

    fn trim_audio(&self, input: &Path, duration: f64, output: &Path) -> ToolResult<()> {
        run(&mut self.ffmpeg(trim_args(input, duration, output)), FFMPEG)?;
        Ok(())
    }

    fn mux(&self, request: &MuxRequest) -> ToolResult<()> {
        run(&mut self.ffmpeg(mux_args(request)), FFMPEG)?;
        Ok(())
    }

    fn burn_subtitles(
        &self,
        request: &BurnRequest,
        on_progress: &mut dyn FnMut(f64),
    ) -> ToolResult<()> {
        let mut cmd = self.ffmpeg(burn_args(request));
        run_streaming(&mut cmd, FFMPEG, &mut |line| {
            if let Some(seconds) = parse_progress_line(line) {
                on_progress(seconds);
            }
        })
    }

    fn thumbnail(&self, request: &ThumbnailRequest) -> ToolResult<()> {
        run(&mut self.ffmpeg(thumbnail_args(request)), FFMPEG)?;
        Ok(())
    }

    fn version(&self) -> ToolResult<String> {
        tool_version(&self.ffmpeg, FFMPEG, self.probe_timeout)
    }
}

fn tool_version(program: &Path, tool: &str, timeout: Duration) -> ToolResult<String> {
    let mut cmd = Command::new(program);
    cmd.arg("-version");
    let stdout = run_with_timeout(&mut cmd, tool, timeout)?;
    String::from_utf8_lossy(&stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ToolError::parse(tool, "empty version output"))
}

/// `ffprobe` arguments: container duration plus first video stream size.
pub fn probe_args(path: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-show_entries".into(),
        "format=duration:stream=width,height".into(),
        "-of".into(),
        "json".into(),
        path.into(),
    ]
}

/// Read the JSON emitted for [`probe_args`].
///
/// Missing fields stay `None`; only unparsable JSON is an error.
pub fn parse_probe_json(stdout: &[u8]) -> ToolResult<MediaInfo> {
    let json: Value =
        serde_json::from_slice(stdout).map_err(|e| ToolError::parse(FFPROBE, e.to_string()))?;

    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| match d {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        });

    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first());
    let dimension = |key: &str| {
        stream
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    };

    Ok(MediaInfo {
        duration,
        width: dimension("width"),
        height: dimension("height"),
    })
}

pub fn pcm_to_wav_args(pcm: &Path, format: PcmFormat, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-f".into(),
        PcmFormat::FFMPEG_FORMAT.into(),
        "-ar".into(),
        format.sample_rate.to_string().into(),
        "-ac".into(),
        PcmFormat::CHANNELS.to_string().into(),
        "-i".into(),
        pcm.into(),
        output.into(),
    ]
}

pub fn pad_args(input: &Path, seconds: f64, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-af".into(),
        format!("apad=pad_dur={}", seconds_arg(seconds)).into(),
        output.into(),
    ]
}

pub fn trim_args(input: &Path, duration: f64, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-t".into(),
        seconds_arg(duration).into(),
        output.into(),
    ]
}

pub fn mux_args(request: &MuxRequest) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        request.video.clone().into(),
        "-i".into(),
        request.audio.clone().into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        request.audio_codec.clone().into(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-t".into(),
        seconds_arg(request.duration).into(),
        request.output.clone().into(),
    ]
}

pub fn burn_args(request: &BurnRequest) -> Vec<OsString> {
    let mut filter = format!("ass=filename='{}'", escape_filter_path(&request.subtitles));
    if let Some(ref fonts_dir) = request.fonts_dir {
        filter.push_str(&format!(":fontsdir='{}'", escape_filter_path(fonts_dir)));
    }

    vec![
        "-y".into(),
        "-i".into(),
        request.input.clone().into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        "-vf".into(),
        filter.into(),
        "-c:v".into(),
        request.video_codec.clone().into(),
        "-c:a".into(),
        "copy".into(),
        "-preset".into(),
        request.preset.clone().into(),
        request.output.clone().into(),
    ]
}

pub fn thumbnail_args(request: &ThumbnailRequest) -> Vec<OsString> {
    let (w, h) = (request.width, request.height);
    vec![
        "-y".into(),
        "-i".into(),
        request.input.clone().into(),
        "-vframes".into(),
        "1".into(),
        "-ss".into(),
        seconds_arg(request.offset_secs).into(),
        "-vf".into(),
        format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}").into(),
        "-q:v".into(),
        request.quality.to_string().into(),
        request.output.clone().into(),
    ]
}

/// Escape a path for use as a filter option value.
///
/// Backslashes are normalized to forward slashes and filtergraph
/// metacharacters are escaped.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 12);
    for ch in normalized.chars() {
        match ch {
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("\\'"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Seconds with microsecond precision, trailing zeros removed.
fn seconds_arg(seconds: f64) -> String {
    let formatted = format!("{:.6}", seconds.max(0.0));
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Render an argument list for logs.
pub fn args_to_string(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
