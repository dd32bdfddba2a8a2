//! Burn step - re-encodes the base mux with captions drawn in.
//!
//! Optional. When it fails for any reason the base mux is delivered.

use std::fs;
use std::path::PathBuf;

use crate::media::{args_to_string, burn_args, BurnRequest};
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::progress::ProgressThrottle;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BurnOutput, Context, JobState, StepOutcome};

const BAND: (f64, f64) = (0.45, 0.95);

pub struct BurnStep;

impl BurnStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BurnStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for BurnStep {
    fn name(&self) -> &str {
        "Burn"
    }

    fn description(&self) -> &str {
        "Burn captions into the video"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Encoding
    }

    fn progress_band(&self) -> (f64, f64) {
        BAND
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.mux.is_none() {
            return Err(StepError::invalid_input("base mux missing"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(subtitles) = state
            .captions
            .as_ref()
            .and_then(|c| c.descriptor_path.clone())
        else {
            return Ok(StepOutcome::Skipped("no subtitle document".to_string()));
        };
        let (Some(mux), Some(duration)) = (state.mux.as_ref(), state.video_duration()) else {
            return Err(StepError::invalid_input("base mux missing"));
        };

        let settings = &ctx.settings;
        let fonts_dir = Some(settings.subtitles.fonts_dir.trim())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);
        let request = BurnRequest {
            input: mux.output_path.clone(),
            subtitles,
            fonts_dir,
            video_codec: settings.assembly.burn_video_codec.clone(),
            preset: settings.assembly.burn_preset.clone(),
            output: ctx.work_file("burned.mp4"),
        };
        let command = format!("ffmpeg {}", args_to_string(&burn_args(&request)));
        ctx.logger.command(&command);

        let mut throttle = ProgressThrottle::new(settings.assembly.progress_step);
        let (band_start, band_end) = BAND;
        let mut on_progress = |seconds: f64| {
            if let Some(fraction) = throttle.offer(seconds / duration) {
                ctx.report_progress(
                    band_start + fraction * (band_end - band_start),
                    JobStatus::Encoding.label(),
                );
                ctx.logger.progress((fraction * 100.0).round() as u32);
            }
        };

        ctx.toolkit
            .burn_subtitles(&request, &mut on_progress)
            .map_err(|e| {
                if let Some(stderr) = e.stderr() {
                    ctx.logger.output_block(stderr, true);
                }
                StepError::encode_tool("Burn", &e)
            })?;

        state.burn = Some(BurnOutput {
            output_path: request.output,
            command,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let Some(ref burn) = state.burn else {
            return Err(StepError::invalid_output("burn output not recorded"));
        };
        match fs::metadata(&burn.output_path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(StepError::encode("Burn", None, "output file missing or empty")),
        }
        match ctx.toolkit.probe(&burn.output_path) {
            Ok(info) if info.usable_duration().is_some() => Ok(()),
            Ok(_) => Err(StepError::encode("Burn", None, "output has no duration")),
            Err(e) => Err(StepError::encode("Burn", None, format!("output unreadable: {}", e))),
        }
    }

    fn discard_output(&self, state: &mut JobState) {
        if let Some(burn) = state.burn.take() {
            let _ = fs::remove_file(burn.output_path);
        }
    }
}
