//! Runs one assembly job end to end.
//!
//! The assembler owns the job lifecycle around the pipeline: workspace and
//! log setup, the progress dispatcher, turning the final `JobState` into an
//! [`AssemblyJob`], and cleanup.

use std::fs;
use std::sync::Arc;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::media::MediaToolkit;
use crate::models::{AssemblyJob, AssemblyRequest, FinalAsset, JobStatus};
use crate::workspace::WorkspacePool;

use super::create_standard_pipeline;
use super::errors::{PipelineError, PipelineResult, StepError, DEFAULT_DIAGNOSTIC_LIMIT};
use super::pipeline::CancelHandle;
use super::progress::{ProgressDispatcher, ProgressSender, ProgressSubscriber};
use super::types::{Context, JobState};

/// Assembles dubbed videos with a shared toolkit and configuration.
///
/// `assemble` is safe to call from several threads at once; jobs only share
/// the workspace pool.
pub struct Assembler {
    settings: Settings,
    toolkit: Arc<dyn MediaToolkit>,
    collaborators: Collaborators,
    workspaces: Arc<WorkspacePool>,
}

impl Assembler {
    pub fn new(settings: Settings, toolkit: Arc<dyn MediaToolkit>) -> Self {
        let workspaces = Arc::new(WorkspacePool::new(&settings.paths.temp_root));
        Self {
            settings,
            toolkit,
            collaborators: Collaborators::default(),
            workspaces,
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_workspace_pool(mut self, pool: Arc<WorkspacePool>) -> Self {
        self.workspaces = pool;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn toolkit(&self) -> &Arc<dyn MediaToolkit> {
        &self.toolkit
    }

    pub fn workspaces(&self) -> &Arc<WorkspacePool> {
        &self.workspaces
    }

    /// Run a job to completion.
    ///
    /// Never panics on job failure: the returned job is either `Done` with
    /// a result or `Failed` with an error message and kind.
    pub fn assemble(
        &self,
        job_id: &str,
        request: AssemblyRequest,
        cancel: &CancelHandle,
        subscriber: Option<ProgressSubscriber>,
    ) -> AssemblyJob {
        let mut job = AssemblyJob::new(job_id, request.kind);
        tracing::info!("Assembling job {}", job_id);

        let (sender, dispatcher) = match subscriber {
            Some(subscriber) => {
                let (sender, dispatcher) = ProgressDispatcher::spawn(subscriber);
                (Some(sender), Some(dispatcher))
            }
            None => (None, None),
        };

        if let Err(e) = self.run_job(job_id, request, cancel, sender, &mut job) {
            tracing::warn!("Job {} failed: {}", job_id, e);
            job.status = JobStatus::Failed;
            job.error = Some(e.diagnostic(DEFAULT_DIAGNOSTIC_LIMIT));
            job.error_kind = Some(e.kind());
            job.result = None;
            job.thumbnail = None;
        }

        if let Some(dispatcher) = dispatcher {
            dispatcher.join();
        }
        job
    }

    fn run_job(
        &self,
        job_id: &str,
        request: AssemblyRequest,
        cancel: &CancelHandle,
        sender: Option<ProgressSender>,
        job: &mut AssemblyJob,
    ) -> PipelineResult<()> {
        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled(job_id));
        }

        let workspace = self
            .workspaces
            .acquire(job_id)
            .map_err(|e| PipelineError::setup_failed(job_id, e.to_string()))?;

        let logger = JobLogger::new(
            job_id,
            &self.settings.paths.logs_folder,
            self.settings.logging.to_log_config(),
            None,
        )
        .map_err(|e| PipelineError::setup_failed(job_id, format!("creating job log: {}", e)))?;

        let mut ctx = Context::new(
            job_id,
            request,
            self.settings.clone(),
            workspace.path().to_path_buf(),
            Arc::new(logger),
            Arc::clone(&self.toolkit),
        )
        .with_collaborators(self.collaborators.clone());
        if let Some(sender) = sender {
            ctx = ctx.with_progress(sender);
        }

        ctx.logger.section(&format!("Job {}", job_id));
        ctx.logger
            .info(&format!("Video: {}", ctx.request.video.source.describe()));
        ctx.logger.info(&format!(
            "Narration: {} bytes at {} Hz",
            ctx.request.narration.pcm.len(),
            ctx.request.narration.format.sample_rate
        ));

        let mut state = JobState::new(job_id);
        let pipeline = create_standard_pipeline().attach_cancel(cancel);
        let outcome = pipeline.run(&ctx, &mut state);

        record_state(job, &state);
        job.progress = ctx.progress();

        let run = match outcome {
            Ok(run) => run,
            Err(e) => {
                ctx.logger.error(&e.to_string());
                ctx.logger.show_tail("ffmpeg output");
                return Err(e);
            }
        };
        job.steps_completed = run.steps_completed;
        job.steps_skipped = run.steps_skipped;
        job.steps_degraded = run.steps_degraded;

        if let Err(e) = finalize(&ctx, &state, job) {
            ctx.logger.error(&format!("Finalizing failed: {}", e));
            return Err(PipelineError::step_failed(job_id, "Finalize", e));
        }

        if !state.advance(JobStatus::Done) {
            return Err(PipelineError::step_failed(
                job_id,
                "Finalize",
                StepError::invalid_output(format!("job ended in {}", state.status)),
            ));
        }
        job.status = JobStatus::Done;
        ctx.report_progress(1.0, JobStatus::Done.label());
        job.progress = 1.0;

        if job.steps_degraded.is_empty() {
            ctx.logger.success("Job finished");
        } else {
            ctx.logger.warn(&format!(
                "Job finished without: {}",
                job.steps_degraded.join(", ")
            ));
        }
        ctx.logger.close();
        Ok(())
    }
}

/// Copy what the steps learned onto the caller-facing job.
fn record_state(job: &mut AssemblyJob, state: &JobState) {
    job.status = state.status;
    job.video = state.probe.as_ref().map(|p| p.effective());
    job.narration_duration = state.narration.as_ref().map(|n| n.original_duration);
    job.caption_timeline = state.captions.as_ref().map(|c| c.timeline.clone());
}

/// Probe and load the delivered video and thumbnail.
fn finalize(ctx: &Context, state: &JobState, job: &mut AssemblyJob) -> Result<(), StepError> {
    let (path, source) = state
        .final_output()
        .ok_or_else(|| StepError::invalid_output("no merged video produced"))?;
    let fallback = state
        .video_duration()
        .ok_or_else(|| StepError::invalid_output("video duration unknown"))?;

    let duration = match ctx.toolkit.probe(path) {
        Ok(info) => info.usable_duration(),
        Err(e) => {
            ctx.logger
                .warn(&format!("Could not probe final video: {}", e));
            None
        }
    }
    .unwrap_or(fallback);

    let bytes = fs::read(path).map_err(|e| StepError::io("reading final video", e))?;
    ctx.logger.info(&format!(
        "Delivering {:?} video: {} bytes, {:.3}s",
        source,
        bytes.len(),
        duration
    ));

    job.result = Some(FinalAsset::new(bytes, source));
    job.duration = Some(duration);
    job.thumbnail = state
        .thumbnail
        .as_ref()
        .and_then(|t| fs::read(&t.path).ok())
        .filter(|bytes| !bytes.is_empty());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{AssetFetcher, FetchError};
    use crate::media::fake::{Op, ScriptedToolkit};
    use crate::models::{
        CaptionSource, ErrorKind, FinalSource, JobKind, MediaAsset, MediaInfo, NarrationAsset,
        RawSegment,
    };
    use crate::orchestrator::progress::ProgressEvent;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        toolkit: Arc<ScriptedToolkit>,
        assembler: Assembler,
    }

    impl Fixture {
        fn new(toolkit: ScriptedToolkit) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut settings = Settings::default();
            settings.paths.temp_root = dir.path().join("temp").to_string_lossy().into_owned();
            settings.paths.logs_folder = dir.path().join("logs").to_string_lossy().into_owned();
            let toolkit = Arc::new(toolkit);
            let assembler = Assembler::new(settings, toolkit.clone());
            Self {
                dir,
                toolkit,
                assembler,
            }
        }

        fn run(&self, request: AssemblyRequest) -> AssemblyJob {
            self.assembler
                .assemble("job-1", request, &CancelHandle::new(), None)
        }

        fn workspaces_left(&self) -> usize {
            fs::read_dir(self.dir.path().join("temp"))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn request() -> AssemblyRequest {
        AssemblyRequest::new(
            MediaAsset::from_bytes(b"video".to_vec()),
            NarrationAsset::from_bytes(vec![0; 48_000], 24_000),
        )
    }

    fn scenario_c() -> CaptionSource {
        CaptionSource::Segments(vec![
            RawSegment::new(0.0, 3.0, "a"),
            RawSegment::new(2.5, 5.0, "b"),
            RawSegment::new(4.0, 6.0, "c"),
        ])
    }

    #[test]
    fn short_narration_is_padded_and_merged() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0));
        let job = fx.run(request());

        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error.is_none());
        assert_eq!(job.narration_duration, Some(9.0));
        assert_eq!(job.duration, Some(12.0));
        assert!(fx.toolkit.called("pad"));
        assert!(!fx.toolkit.called("trim"));

        let result = job.result.unwrap();
        assert_eq!(result.source, FinalSource::BaseMux);
        assert_eq!(result.bytes, b"base-mux");
        assert_eq!(job.thumbnail.as_deref(), Some(&b"webp"[..]));
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.steps_skipped, vec!["Captions", "Burn"]);
    }

    #[test]
    fn long_narration_is_trimmed() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 13.0));
        let job = fx.run(request());

        assert!(job.is_done());
        assert!(fx.toolkit.called("trim"));
        assert_eq!(job.duration, Some(12.0));
    }

    #[test]
    fn slight_overshoot_is_cut_by_the_mux() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 12.3));
        let job = fx.run(request());

        assert!(job.is_done());
        assert!(!fx.toolkit.called("trim"));
        assert_eq!(job.narration_duration, Some(12.3));
        assert_eq!(job.duration, Some(12.0));
    }

    #[test]
    fn narration_within_tolerance_is_untouched() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 11.8));
        let job = fx.run(request());

        assert!(job.is_done());
        assert!(!fx.toolkit.called("pad"));
        assert!(!fx.toolkit.called("trim"));
    }

    #[test]
    fn captions_are_normalized_and_burned() {
        let fx = Fixture::new(ScriptedToolkit::new(10.0, 10.0));
        let job = fx.run(request().with_captions(scenario_c()));

        assert!(job.is_done());
        let timeline = job.caption_timeline.unwrap();
        let spans: Vec<(f64, f64, &str)> = timeline
            .segments()
            .iter()
            .map(|c| (c.start, c.end, c.text.as_str()))
            .collect();
        assert_eq!(spans, vec![(0.0, 2.5, "a"), (2.5, 4.0, "b"), (4.0, 6.0, "c")]);

        let result = job.result.unwrap();
        assert_eq!(result.source, FinalSource::Burned);
        assert_eq!(result.bytes, b"burned");
        assert!(job.steps_degraded.is_empty());
    }

    #[test]
    fn failed_burn_delivers_base_mux() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::Burn));
        let job = fx.run(request().with_captions(scenario_c()));

        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error.is_none());
        assert_eq!(job.steps_degraded, vec!["Burn"]);
        let result = job.result.unwrap();
        assert_eq!(result.source, FinalSource::BaseMux);
        assert_eq!(result.bytes, b"base-mux");
        assert_eq!(job.duration, Some(12.0));
    }

    #[test]
    fn empty_burn_output_delivers_base_mux() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 12.0).with_empty_burn_output());
        let job = fx.run(request().with_captions(scenario_c()));

        assert!(job.is_done());
        assert_eq!(job.steps_degraded, vec!["Burn"]);
        assert_eq!(job.result.unwrap().source, FinalSource::BaseMux);
    }

    #[test]
    fn unreadable_transcript_only_drops_captions() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 12.0));
        let srt = "1\n00:00:01,000 --> nonsense\nhello\n".to_string();
        let job = fx.run(request().with_captions(CaptionSource::Srt(srt)));

        assert!(job.is_done());
        assert_eq!(job.steps_degraded, vec!["Captions"]);
        assert!(job.caption_timeline.is_none());
        assert!(!fx.toolkit.called("burn"));
        assert_eq!(job.result.unwrap().source, FinalSource::BaseMux);
    }

    #[test]
    fn mux_failure_fails_the_job() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::Mux));
        let job = fx.run(request());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_kind, Some(ErrorKind::Encode));
        let error = job.error.unwrap();
        assert!(error.starts_with("Mux:"), "{error}");
        assert!(error.chars().count() <= DEFAULT_DIAGNOSTIC_LIMIT + 1);
        assert!(job.result.is_none());
        assert_eq!(fx.workspaces_left(), 0);
    }

    #[test]
    fn thumbnail_failure_only_omits_thumbnail() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::Thumbnail));
        let job = fx.run(request());

        assert!(job.is_done());
        assert!(job.thumbnail.is_none());
        assert!(job.result.is_some());
        assert_eq!(job.steps_degraded, vec!["Thumbnail"]);
    }

    #[test]
    fn probe_failure_uses_fallbacks_by_job_kind() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::ProbeVideo));
        let job = fx.run(request());
        assert!(job.is_done());
        assert_eq!(job.video_duration(), Some(10.0));
        let video = job.video.unwrap();
        assert_eq!((video.width, video.height), (Some(1080), Some(1920)));

        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::ProbeVideo));
        let job = fx.run(request().with_kind(JobKind::Narrated));
        assert_eq!(job.video_duration(), Some(15.0));
        assert_eq!(job.duration, Some(15.0));
    }

    #[test]
    fn missing_dimensions_fall_back_but_probed_duration_is_kept() {
        let toolkit = ScriptedToolkit::new(12.0, 8.0).with_video_info(MediaInfo {
            duration: Some(8.0),
            width: None,
            height: None,
        });
        let fx = Fixture::new(toolkit);
        let job = fx.run(request());

        assert!(job.is_done());
        assert_eq!(job.video_duration(), Some(8.0));
        let video = job.video.unwrap();
        assert_eq!((video.width, video.height), (Some(1080), Some(1920)));
        assert!(!fx.toolkit.called("pad"));
    }

    #[test]
    fn supplied_metadata_skips_the_probe() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::ProbeVideo));
        let mut req = request();
        req.video = req.video.with_duration(20.0).with_dimensions(720, 1280);
        let job = fx.run(req);

        assert!(job.is_done());
        assert_eq!(job.video_duration(), Some(20.0));
        assert_eq!(job.video.unwrap().width, Some(720));
    }

    #[test]
    fn empty_narration_is_a_format_error() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0));
        let mut req = request();
        req.narration = NarrationAsset::from_bytes(Vec::new(), 24_000);
        let job = fx.run(req);

        assert!(job.is_failed());
        assert_eq!(job.error_kind, Some(ErrorKind::Format));
    }

    #[test]
    fn narration_decode_failure_is_a_format_error() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::PcmToWav));
        let job = fx.run(request());
        assert_eq!(job.error_kind, Some(ErrorKind::Format));
        assert!(!fx.toolkit.called("mux"));
    }

    #[test]
    fn narration_probe_failure_uses_pcm_length() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0).failing(Op::ProbeNarration));
        let job = fx.run(request());

        assert!(job.is_done());
        // 48000 bytes of 16-bit mono at 24 kHz.
        assert_eq!(job.narration_duration, Some(1.0));
        assert!(fx.toolkit.called("pad"));
    }

    #[test]
    fn cancelled_job_never_starts() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0));
        let cancel = CancelHandle::new();
        cancel.cancel();
        let job = fx.assembler.assemble("job-1", request(), &cancel, None);

        assert!(job.is_failed());
        assert_eq!(job.error_kind, Some(ErrorKind::Cancelled));
        assert!(fx.toolkit.calls().is_empty());
    }

    #[test]
    fn workspace_is_removed_after_success() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0));
        let job = fx.run(request().with_captions(scenario_c()));
        assert!(job.is_done());
        assert_eq!(fx.workspaces_left(), 0);
        assert_eq!(fx.assembler.workspaces().active_count(), 0);
        assert!(fx.dir.path().join("logs").join("job-1.log").exists());
    }

    #[test]
    fn progress_is_non_decreasing_and_ends_at_one() {
        let fx = Fixture::new(
            ScriptedToolkit::new(12.0, 12.0).with_burn_progress(vec![0.0, 3.0, 6.0, 2.0, 12.0]),
        );
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
        let sink = Arc::clone(&events);
        let job = fx.assembler.assemble(
            "job-1",
            request().with_captions(scenario_c()),
            &CancelHandle::new(),
            Some(Box::new(move |event| sink.lock().unwrap().push(event))),
        );
        assert!(job.is_done());

        let events = events.lock().unwrap();
        let fractions: Vec<f64> = events.iter().map(|e| e.fraction).collect();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");
        assert_eq!(fractions.last(), Some(&1.0));
        assert_eq!(events.last().unwrap().label, "done");
        // Burn at 25% and 50% of the video maps into the 0.45..0.95 band.
        assert!(fractions.iter().any(|f| (f - 0.575).abs() < 1e-9));
        assert!(fractions.iter().any(|f| (f - 0.70).abs() < 1e-9));
    }

    struct StaticFetcher(Vec<u8>);

    impl AssetFetcher for StaticFetcher {
        fn fetch(&self, handle: &str) -> Result<Vec<u8>, FetchError> {
            if handle.starts_with("https://") {
                Ok(self.0.clone())
            } else {
                Err(FetchError::failed(handle, "unsupported scheme"))
            }
        }
    }

    #[test]
    fn remote_video_goes_through_fetcher() {
        let fx = Fixture::new(ScriptedToolkit::new(12.0, 9.0));
        let mut req = request();
        req.video = MediaAsset::from_remote("https://cdn.example/clip.mp4");

        let job = fx.run(req.clone());
        assert!(job.is_failed());
        assert_eq!(job.error_kind, Some(ErrorKind::Fetch));

        let assembler = Assembler::new(fx.assembler.settings().clone(), fx.toolkit.clone())
            .with_collaborators(
                Collaborators::new().with_fetcher(Arc::new(StaticFetcher(b"remote".to_vec()))),
            );
        let job = assembler.assemble("job-2", req, &CancelHandle::new(), None);
        assert!(job.is_done(), "{:?}", job.error);
    }
}
