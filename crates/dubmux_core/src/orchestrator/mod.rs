//! Assembly orchestrator.
//!
//! Runs an assembly job as a sequence of steps that validate, execute,
//! and record their results in a shared `JobState`.
//!
//! # Architecture
//!
//! ```text
//! Pipeline                      status              optional
//!     ├── Step: Fetch           Probing
//!     ├── Step: Probe           Probing
//!     ├── Step: Reconcile       ReconcilingAudio
//!     ├── Step: Captions        Captioning          yes
//!     ├── Step: Mux             Encoding
//!     ├── Step: Burn            Encoding            yes
//!     └── Step: Thumbnail       Thumbnailing        yes
//! ```
//!
//! A failing optional step degrades the job instead of failing it. A failed
//! burn means the base mux is delivered.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dubmux_core::config::Settings;
//! use dubmux_core::media::FfmpegToolkit;
//! use dubmux_core::models::{AssemblyRequest, MediaAsset, NarrationAsset};
//! use dubmux_core::orchestrator::{Assembler, CancelHandle};
//!
//! let settings = Settings::default();
//! let toolkit = Arc::new(FfmpegToolkit::from_settings(&settings.tools));
//! let assembler = Assembler::new(settings, toolkit);
//!
//! let request = AssemblyRequest::new(
//!     MediaAsset::from_file("clip.mp4"),
//!     NarrationAsset::from_file("narration.pcm".as_ref(), 24_000).unwrap(),
//! );
//! let job = assembler.assemble("job-1", request, &CancelHandle::new(), None);
//! println!("{:?} {:?}", job.status, job.duration);
//! ```

mod assembler;
mod errors;
mod pipeline;
mod progress;
mod step;
pub mod steps;
mod types;

pub use assembler::Assembler;
pub use errors::{PipelineError, PipelineResult, StepError, StepResult, DEFAULT_DIAGNOSTIC_LIMIT};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use progress::{
    ProgressDispatcher, ProgressEvent, ProgressSender, ProgressSubscriber, ProgressThrottle,
    DEFAULT_PROGRESS_STEP,
};
pub use step::PipelineStep;
pub use steps::{
    BurnStep, CaptionsStep, FetchStep, MuxStep, ProbeStep, ReconcileStep, ThumbnailStep,
};
pub use types::{
    BurnOutput, CaptionsOutput, Context, JobState, MuxOutput, NarrationOutput, ProbeOutput,
    SourceOutput, StepOutcome, ThumbnailOutput,
};

/// Create the standard assembly pipeline with all steps in order.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(FetchStep::new())
        .with_step(ProbeStep::new())
        .with_step(ReconcileStep::new())
        .with_step(CaptionsStep::new())
        .with_step(MuxStep::new())
        .with_step(BurnStep::new())
        .with_step(ThumbnailStep::new())
}
