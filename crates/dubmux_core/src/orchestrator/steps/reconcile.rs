//! Reconcile step - decodes the narration PCM and fits it to the video.

use std::fs;

use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, NarrationOutput, StepOutcome};
use crate::reconcile::{apply_reconciliation, plan_reconciliation};

/// PCM → WAV, narration probe, then pad or trim to the video duration.
///
/// Every failure here is a format error and fails the job.
pub struct ReconcileStep;

impl ReconcileStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReconcileStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ReconcileStep {
    fn name(&self) -> &str {
        "Reconcile"
    }

    fn description(&self) -> &str {
        "Match narration duration to the video"
    }

    fn status(&self) -> JobStatus {
        JobStatus::ReconcilingAudio
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.10, 0.25)
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let narration = &ctx.request.narration;
        if narration.is_empty() {
            return Err(StepError::format("narration PCM is empty"));
        }
        if narration.format.sample_rate == 0 {
            return Err(StepError::format("narration sample rate must be positive"));
        }
        if state.video_duration().is_none() {
            return Err(StepError::invalid_input("video duration unknown"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let video_duration = state
            .video_duration()
            .ok_or_else(|| StepError::invalid_input("video duration unknown"))?;
        let narration = &ctx.request.narration;

        let pcm_path = ctx.work_file("narration.pcm");
        let wav_path = ctx.work_file("narration.wav");
        fs::write(&pcm_path, &narration.pcm)
            .map_err(|e| StepError::io("writing narration PCM", e))?;

        ctx.logger.info(&format!(
            "Decoding narration: {} bytes, {} Hz mono s16le",
            narration.pcm.len(),
            narration.format.sample_rate
        ));
        ctx.toolkit
            .pcm_to_wav(&pcm_path, narration.format, &wav_path)
            .map_err(|e| {
                ctx.logger.output_block(&e.to_string(), true);
                StepError::format(format!("decoding narration: {}", e))
            })?;

        let probed = ctx
            .toolkit
            .probe(&wav_path)
            .ok()
            .and_then(|info| info.usable_duration());
        let original_duration = match probed {
            Some(duration) => duration,
            None => {
                let computed = narration.computed_duration();
                ctx.logger.warn(&format!(
                    "Narration probe failed, using PCM length ({:.3}s)",
                    computed
                ));
                computed
            }
        };

        let action = plan_reconciliation(
            video_duration,
            original_duration,
            ctx.settings.assembly.desync_tolerance,
        );
        ctx.logger.info(&format!(
            "Narration {:.3}s vs video {:.3}s: {}",
            original_duration,
            video_duration,
            action.describe()
        ));

        let output_path = ctx.work_file("narration_reconciled.wav");
        let reconciled = apply_reconciliation(ctx.toolkit.as_ref(), &wav_path, &output_path, action)
            .map_err(|e| StepError::format(format!("reconciling narration: {}", e)))?
            .to_path_buf();

        state.narration = Some(NarrationOutput {
            wav_path,
            original_duration,
            action,
            reconciled_path: reconciled,
            duration: action.resulting_duration(original_duration),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.narration {
            Some(ref n) if n.reconciled_path.is_file() => Ok(()),
            Some(ref n) => Err(StepError::format(format!(
                "reconciled narration missing: {}",
                n.reconciled_path.display()
            ))),
            None => Err(StepError::invalid_output("narration not recorded")),
        }
    }
}
