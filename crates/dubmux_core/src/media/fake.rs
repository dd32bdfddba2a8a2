//! Scripted toolkit for tests.
//!
//! Writes small marker files instead of media and remembers the duration of
//! everything it "produced" so later probes answer consistently.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::models::{MediaInfo, PcmFormat};

use super::error::{ToolError, ToolResult};
use super::toolkit::{BurnRequest, MediaToolkit, MuxRequest, ThumbnailRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ProbeVideo,
    ProbeNarration,
    ProbeOutput,
    PcmToWav,
    Pad,
    Trim,
    Mux,
    Burn,
    Thumbnail,
}

pub struct ScriptedToolkit {
    video: MediaInfo,
    narration_duration: f64,
    failures: Mutex<HashSet<Op>>,
    burn_progress: Vec<f64>,
    burn_writes_empty: bool,
    produced: Mutex<HashMap<PathBuf, f64>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedToolkit {
    pub fn new(video_duration: f64, narration_duration: f64) -> Self {
        Self {
            video: MediaInfo {
                duration: Some(video_duration),
                width: Some(1080),
                height: Some(1920),
            },
            narration_duration,
            failures: Mutex::new(HashSet::new()),
            burn_progress: Vec::new(),
            burn_writes_empty: false,
            produced: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_video_info(mut self, info: MediaInfo) -> Self {
        self.video = info;
        self
    }

    pub fn failing(self, op: Op) -> Self {
        self.failures.lock().insert(op);
        self
    }

    pub fn with_burn_progress(mut self, seconds: Vec<f64>) -> Self {
        self.burn_progress = seconds;
        self
    }

    pub fn with_empty_burn_output(mut self) -> Self {
        self.burn_writes_empty = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.lock().iter().any(|c| c == name)
    }

    fn enter(&self, op: Op, name: &str) -> ToolResult<()> {
        self.calls.lock().push(name.to_string());
        if self.failures.lock().contains(&op) {
            return Err(ToolError::failed("ffmpeg", 1, format!("{} scripted failure", name)));
        }
        Ok(())
    }

    fn produce(&self, path: &Path, duration: f64, contents: &[u8]) -> ToolResult<()> {
        fs::write(path, contents).map_err(|e| ToolError::io("writing fake output", e))?;
        self.produced.lock().insert(path.to_path_buf(), duration);
        Ok(())
    }

    fn duration_of(&self, path: &Path) -> f64 {
        self.produced.lock().get(path).copied().unwrap_or(0.0)
    }
}

impl MediaToolkit for ScriptedToolkit {
    fn probe(&self, path: &Path) -> ToolResult<MediaInfo> {
        if let Some(duration) = self.produced.lock().get(path).copied() {
            let is_audio = path.extension().is_some_and(|e| e == "wav");
            let op = if is_audio { Op::ProbeNarration } else { Op::ProbeOutput };
            self.enter(op, "probe")?;
            return Ok(if is_audio {
                MediaInfo { duration: Some(duration), width: None, height: None }
            } else {
                MediaInfo { duration: Some(duration), ..self.video }
            });
        }
        self.enter(Op::ProbeVideo, "probe")?;
        Ok(self.video)
    }

    fn pcm_to_wav(&self, _pcm: &Path, _format: PcmFormat, output: &Path) -> ToolResult<()> {
        self.enter(Op::PcmToWav, "pcm_to_wav")?;
        self.produce(output, self.narration_duration, b"wav")
    }

    fn pad_audio(&self, input: &Path, seconds: f64, output: &Path) -> ToolResult<()> {
        self.enter(Op::Pad, "pad")?;
        let duration = self.duration_of(input) + seconds;
        self.produce(output, duration, b"padded")
    }

    fn trim_audio(&self, _input: &Path, duration: f64, output: &Path) -> ToolResult<()> {
        self.enter(Op::Trim, "trim")?;
        self.produce(output, duration, b"trimmed")
    }

    fn mux(&self, request: &MuxRequest) -> ToolResult<()> {
        self.enter(Op::Mux, "mux")?;
        self.produce(&request.output, request.duration, b"base-mux")
    }

    fn burn_subtitles(
        &self,
        request: &BurnRequest,
        on_progress: &mut dyn FnMut(f64),
    ) -> ToolResult<()> {
        for seconds in &self.burn_progress {
            on_progress(*seconds);
        }
        self.enter(Op::Burn, "burn")?;
        let duration = self.duration_of(&request.input);
        let contents: &[u8] = if self.burn_writes_empty { b"" } else { b"burned" };
        self.produce(&request.output, duration, contents)
    }

    fn thumbnail(&self, request: &ThumbnailRequest) -> ToolResult<()> {
        self.enter(Op::Thumbnail, "thumbnail")?;
        self.produce(&request.output, 0.0, b"webp")
    }

    fn version(&self) -> ToolResult<String> {
        Ok("ffmpeg version scripted".to_string())
    }
}
