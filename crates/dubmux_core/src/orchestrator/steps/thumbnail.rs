//! Thumbnail step - one still frame of the delivered video.

use std::fs;

use crate::media::{args_to_string, thumbnail_args, ThumbnailRequest};
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome, ThumbnailOutput};

pub struct ThumbnailStep;

impl ThumbnailStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThumbnailStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ThumbnailStep {
    fn name(&self) -> &str {
        "Thumbnail"
    }

    fn description(&self) -> &str {
        "Capture a still image of the final video"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Thumbnailing
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.95, 1.0)
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.final_output().is_none() {
            return Err(StepError::invalid_input("no video to capture"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let settings = &ctx.settings.thumbnail;
        if !settings.enabled {
            return Ok(StepOutcome::Skipped("thumbnails disabled".to_string()));
        }
        let Some((input, _)) = state.final_output() else {
            return Err(StepError::invalid_input("no video to capture"));
        };

        let request = ThumbnailRequest {
            input: input.to_path_buf(),
            width: settings.width,
            height: settings.height,
            offset_secs: settings.offset_secs,
            quality: settings.quality,
            output: ctx.work_file(&format!("thumbnail.{}", settings.format)),
        };
        ctx.logger
            .command(&format!("ffmpeg {}", args_to_string(&thumbnail_args(&request))));
        ctx.toolkit
            .thumbnail(&request)
            .map_err(|e| StepError::encode_tool("Thumbnail", &e))?;

        state.thumbnail = Some(ThumbnailOutput {
            path: request.output,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let Some(ref thumbnail) = state.thumbnail else {
            return Err(StepError::invalid_output("thumbnail not recorded"));
        };
        match fs::metadata(&thumbnail.path) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(StepError::invalid_output("thumbnail missing or empty")),
        }
    }

    fn discard_output(&self, state: &mut JobState) {
        state.thumbnail = None;
    }
}
