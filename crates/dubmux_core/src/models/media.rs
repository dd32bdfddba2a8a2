//! Media asset structures (source video, narration audio, probe results).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Where the bytes of a media asset come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// In-memory payload.
    Bytes(Vec<u8>),
    /// File already on local disk.
    File(PathBuf),
    /// Remote handle, resolved by an `AssetFetcher`.
    Remote(String),
}

impl AssetSource {
    /// Short description for logs (never includes payload bytes).
    pub fn describe(&self) -> String {
        match self {
            AssetSource::Bytes(bytes) => format!("{} bytes in memory", bytes.len()),
            AssetSource::File(path) => path.display().to_string(),
            AssetSource::Remote(handle) => format!("remote {}", handle),
        }
    }
}

/// A video asset plus whatever metadata the caller already knows.
///
/// `duration`, `width` and `height` are usually left empty and filled in by
/// the probe step. When the caller supplies them they take precedence over
/// probing.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub source: AssetSource,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MediaAsset {
    pub fn new(source: AssetSource) -> Self {
        Self {
            source,
            duration: None,
            width: None,
            height: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(AssetSource::Bytes(bytes))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(AssetSource::File(path.into()))
    }

    pub fn from_remote(handle: impl Into<String>) -> Self {
        Self::new(AssetSource::Remote(handle.into()))
    }

    /// Attach a known duration (seconds).
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attach known frame dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Metadata returned by a probe.
///
/// Every field is optional: a probe may find the container duration but no
/// video stream, or vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MediaInfo {
    /// Duration only if it is a usable positive number.
    pub fn usable_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Dimensions only if both are present and non-zero.
    pub fn usable_dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Raw PCM layout of the narration: signed 16-bit little-endian, mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
}

impl PcmFormat {
    pub const CHANNELS: u32 = 1;
    pub const BYTES_PER_SAMPLE: u32 = 2;
    /// ffmpeg demuxer name for this layout.
    pub const FFMPEG_FORMAT: &'static str = "s16le";

    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Exact playback length of `byte_len` bytes of PCM in seconds.
    pub fn duration_of(&self, byte_len: usize) -> f64 {
        let bytes_per_second = self.sample_rate * Self::CHANNELS * Self::BYTES_PER_SAMPLE;
        if bytes_per_second == 0 {
            return 0.0;
        }
        byte_len as f64 / bytes_per_second as f64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::new(24_000)
    }
}

/// Synthesized narration track as raw PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationAsset {
    pub pcm: Vec<u8>,
    pub format: PcmFormat,
}

impl NarrationAsset {
    pub fn from_bytes(pcm: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            pcm,
            format: PcmFormat::new(sample_rate),
        }
    }

    /// Read raw PCM from a file on disk.
    pub fn from_file(path: &Path, sample_rate: u32) -> io::Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?, sample_rate))
    }

    /// Decode base64-encoded PCM.
    pub fn from_base64(encoded: &str, sample_rate: u32) -> Result<Self, base64::DecodeError> {
        let pcm = STANDARD.decode(encoded.trim())?;
        Ok(Self::from_bytes(pcm, sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Duration computed from the byte length alone.
    pub fn computed_duration(&self) -> f64 {
        self.format.duration_of(self.pcm.len())
    }
}
