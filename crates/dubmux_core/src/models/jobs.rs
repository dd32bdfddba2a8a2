//! Job-related data structures (requests, status, finished snapshot).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::captions::{CaptionSource, CaptionTimeline};
use super::media::{MediaAsset, MediaInfo, NarrationAsset};

/// Which entry point a job came from.
///
/// Only affects the duration fallback when the source video cannot be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Standalone merge of a finished narration onto a video.
    #[default]
    Merge,
    /// Part of the full narration pipeline (script, TTS, merge).
    Narrated,
}

/// Lifecycle of an assembly job.
///
/// ```text
/// Pending -> Probing -> ReconcilingAudio -> [Captioning] -> Encoding
///         -> Thumbnailing -> Done
/// ```
/// `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Probing,
    ReconcilingAudio,
    Captioning,
    Encoding,
    Thumbnailing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same non-terminal state is allowed (several steps can
    /// run under one status).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;

        if self.is_terminal() {
            return false;
        }
        if *self == next || next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Probing)
                | (Probing, ReconcilingAudio)
                | (ReconcilingAudio, Captioning)
                | (ReconcilingAudio, Encoding)
                | (Captioning, Encoding)
                | (Encoding, Thumbnailing)
                | (Thumbnailing, Done)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Probing => "probing",
            JobStatus::ReconcilingAudio => "reconciling audio",
            JobStatus::Captioning => "captioning",
            JobStatus::Encoding => "encoding",
            JobStatus::Thumbnailing => "thumbnailing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything needed to assemble one dubbed video.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub kind: JobKind,
    pub video: MediaAsset,
    pub narration: NarrationAsset,
    /// Optional caption source; no captions are burned without one.
    pub captions: Option<CaptionSource>,
    /// Narration script, passed to the text corrector as context.
    pub script: Option<String>,
}

impl AssemblyRequest {
    pub fn new(video: MediaAsset, narration: NarrationAsset) -> Self {
        Self {
            kind: JobKind::Merge,
            video,
            narration,
            captions: None,
            script: None,
        }
    }

    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_captions(mut self, captions: CaptionSource) -> Self {
        self.captions = Some(captions);
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }
}

/// Which encode produced the delivered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSource {
    /// Captions were burned into the video.
    Burned,
    /// Base mux without captions (no captions, or the burn degraded).
    BaseMux,
}

/// The delivered video.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAsset {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size: usize,
    pub source: FinalSource,
}

impl FinalAsset {
    pub fn new(bytes: Vec<u8>, source: FinalSource) -> Self {
        Self {
            size: bytes.len(),
            bytes,
            source,
        }
    }
}

impl fmt::Debug for FinalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalAsset")
            .field("size", &self.size)
            .field("source", &self.source)
            .finish()
    }
}

/// Coarse failure category surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    Probe,
    Format,
    Validation,
    Encode,
    Io,
    Cancelled,
    Internal,
}

/// Snapshot of a job, handed back to the caller by value once it finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyJob {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Overall progress in `[0, 1]`.
    pub progress: f64,
    /// Probed (or fallback) source video metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_timeline: Option<CaptionTimeline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FinalAsset>,
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
    /// Duration of the delivered asset in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub steps_completed: Vec<String>,
    #[serde(default)]
    pub steps_skipped: Vec<String>,
    #[serde(default)]
    pub steps_degraded: Vec<String>,
}

impl AssemblyJob {
    pub fn new(job_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Done
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    /// Duration of the source video as used for reconciliation.
    pub fn video_duration(&self) -> Option<f64> {
        self.video.and_then(|v| v.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        use JobStatus::*;
        let path = [
            Pending,
            Probing,
            ReconcilingAudio,
            Captioning,
            Encoding,
            Thumbnailing,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
        assert!(ReconcilingAudio.can_transition_to(Encoding));
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
        assert!(JobStatus::Encoding.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Encoding));
        assert!(!JobStatus::Encoding.can_transition_to(JobStatus::Captioning));
        assert!(!JobStatus::Probing.can_transition_to(JobStatus::Done));
    }

    #[test]
    fn job_snapshot_serializes_without_payload() {
        let mut job = AssemblyJob::new("job-1", JobKind::Merge);
        job.result = Some(FinalAsset::new(vec![1, 2, 3], FinalSource::BaseMux));
        job.thumbnail = Some(vec![9; 10]);
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"job_id\":\"job-1\""));
        assert!(json.contains("\"size\":3"));
        assert!(json.contains("\"base_mux\""));
        assert!(!json.contains("thumbnail"));
    }
}
