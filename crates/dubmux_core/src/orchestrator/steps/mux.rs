//! Mux step - source video stream plus reconciled narration.
//!
//! This is the one encode a job cannot do without: failure here fails the
//! job.

use std::fs;

use crate::media::{args_to_string, mux_args, MuxRequest};
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, MuxOutput, StepOutcome};

pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn description(&self) -> &str {
        "Merge the video stream with the narration track"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Encoding
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.30, 0.45)
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.source.is_none() {
            return Err(StepError::invalid_input("source video not fetched"));
        }
        if state.narration.is_none() {
            return Err(StepError::invalid_input("narration not reconciled"));
        }
        if state.video_duration().is_none() {
            return Err(StepError::invalid_input("video duration unknown"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(source), Some(narration), Some(duration)) = (
            state.source.as_ref(),
            state.narration.as_ref(),
            state.video_duration(),
        ) else {
            return Err(StepError::invalid_input("mux inputs incomplete"));
        };

        let request = MuxRequest {
            video: source.path.clone(),
            audio: narration.reconciled_path.clone(),
            duration,
            audio_codec: ctx.settings.assembly.audio_codec.clone(),
            output: ctx.work_file("merged.mp4"),
        };
        let command = format!("ffmpeg {}", args_to_string(&mux_args(&request)));
        ctx.logger.command(&command);

        ctx.toolkit.mux(&request).map_err(|e| {
            if let Some(stderr) = e.stderr() {
                ctx.logger.output_block(stderr, true);
            }
            ctx.logger.show_tail("ffmpeg output");
            StepError::encode_tool("Mux", &e)
        })?;

        state.mux = Some(MuxOutput {
            output_path: request.output,
            duration,
            command,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let Some(ref mux) = state.mux else {
            return Err(StepError::invalid_output("mux output not recorded"));
        };
        match fs::metadata(&mux.output_path) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(StepError::encode("Mux", None, "output file missing or empty")),
        }
    }
}
