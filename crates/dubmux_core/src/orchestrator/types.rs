//! Core types for the assembly pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::media::MediaToolkit;
use crate::models::{AssemblyRequest, CaptionTimeline, FinalSource, JobStatus, MediaInfo};
use crate::reconcile::ReconcileAction;

use super::progress::ProgressSender;

/// Read-only context passed to pipeline steps.
///
/// Contains the request and shared resources that steps can read but not
/// modify. Mutable state goes in `JobState`.
pub struct Context {
    pub job_id: String,
    pub request: AssemblyRequest,
    pub settings: Settings,
    /// Job workspace; every intermediate file goes here.
    pub work_dir: PathBuf,
    pub logger: Arc<JobLogger>,
    pub toolkit: Arc<dyn MediaToolkit>,
    pub collaborators: Collaborators,
    progress: Option<ProgressSender>,
    reported: Mutex<f64>,
}

impl Context {
    pub fn new(
        job_id: impl Into<String>,
        request: AssemblyRequest,
        settings: Settings,
        work_dir: PathBuf,
        logger: Arc<JobLogger>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            request,
            settings,
            work_dir,
            logger,
            toolkit,
            collaborators: Collaborators::default(),
            progress: None,
            reported: Mutex::new(0.0),
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Report overall progress. Values below the current level are ignored.
    pub fn report_progress(&self, fraction: f64, label: &str) {
        let mut reported = self.reported.lock();
        if fraction < *reported {
            return;
        }
        *reported = fraction.clamp(0.0, 1.0);
        if let Some(ref sender) = self.progress {
            sender.send(*reported, label);
        }
    }

    /// Highest progress reported so far.
    pub fn progress(&self) -> f64 {
        *self.reported.lock()
    }

    /// Path of a file in the job workspace.
    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Each step writes its own section. An optional step that degrades has
/// its section cleared again.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobState {
    pub job_id: String,
    pub started_at: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<CaptionsOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<MuxOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burn: Option<BurnOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailOutput>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Move to `next`. Returns false (and stays put) on an illegal move.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Source video duration used for every downstream decision.
    pub fn video_duration(&self) -> Option<f64> {
        self.probe.as_ref().map(|p| p.duration)
    }

    /// The encode that should be delivered: burned if present, else the
    /// base mux.
    pub fn final_output(&self) -> Option<(&Path, FinalSource)> {
        if let Some(ref burn) = self.burn {
            return Some((burn.output_path.as_path(), FinalSource::Burned));
        }
        self.mux
            .as_ref()
            .map(|m| (m.output_path.as_path(), FinalSource::BaseMux))
    }
}

/// Output from the Fetch step.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutput {
    pub path: PathBuf,
    pub size: u64,
}

/// Output from the Probe step.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutput {
    /// What the probe actually returned.
    pub probed: MediaInfo,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub duration_fallback: bool,
    pub dimensions_fallback: bool,
}

impl ProbeOutput {
    /// Metadata as reported to callers (fallbacks applied).
    pub fn effective(&self) -> MediaInfo {
        MediaInfo {
            duration: Some(self.duration),
            width: Some(self.width),
            height: Some(self.height),
        }
    }
}

/// Output from the Reconcile step.
#[derive(Debug, Clone, Serialize)]
pub struct NarrationOutput {
    pub wav_path: PathBuf,
    pub original_duration: f64,
    pub action: ReconcileAction,
    pub reconciled_path: PathBuf,
    pub duration: f64,
}

/// Output from the Captions step.
#[derive(Debug, Clone, Serialize)]
pub struct CaptionsOutput {
    pub timeline: CaptionTimeline,
    /// Written ASS document; `None` when no caption fell inside the video.
    pub descriptor_path: Option<PathBuf>,
    pub corrected: bool,
}

/// Output from the Mux step.
#[derive(Debug, Clone, Serialize)]
pub struct MuxOutput {
    pub output_path: PathBuf,
    pub duration: f64,
    pub command: String,
}

/// Output from the Burn step.
#[derive(Debug, Clone, Serialize)]
pub struct BurnOutput {
    pub output_path: PathBuf,
    pub command: String,
}

/// Output from the Thumbnail step.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailOutput {
    pub path: PathBuf,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}
