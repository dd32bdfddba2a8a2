//! Probe step - source video duration and frame size.
//!
//! Caller-supplied metadata wins. Whatever is still missing is probed, and
//! whatever the probe cannot tell falls back to configured defaults. This
//! step never fails because of the probe itself.

use crate::models::{JobKind, JobStatus, MediaInfo};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, ProbeOutput, StepOutcome};

pub struct ProbeStep;

impl ProbeStep {
    pub fn new() -> Self {
        Self
    }

    fn fallback_duration(ctx: &Context) -> f64 {
        match ctx.request.kind {
            JobKind::Merge => ctx.settings.assembly.merge_fallback_duration,
            JobKind::Narrated => ctx.settings.assembly.narrated_fallback_duration,
        }
    }
}

impl Default for ProbeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ProbeStep {
    fn name(&self) -> &str {
        "Probe"
    }

    fn description(&self) -> &str {
        "Read source video duration and dimensions"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Probing
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.05, 0.10)
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.source.is_none() {
            return Err(StepError::invalid_input("source video not fetched"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(ref source) = state.source else {
            return Err(StepError::invalid_input("source video not fetched"));
        };
        let video = &ctx.request.video;
        let supplied = MediaInfo {
            duration: video.duration,
            width: video.width,
            height: video.height,
        };

        let probed = if supplied.usable_duration().is_some()
            && supplied.usable_dimensions().is_some()
        {
            ctx.logger.info("Using caller-supplied video metadata");
            supplied
        } else {
            match ctx.toolkit.probe(&source.path) {
                Ok(info) => info,
                Err(e) => {
                    let err = StepError::probe("source video", e.to_string());
                    ctx.logger.warn(&format!("{} - using fallback values", err));
                    MediaInfo::default()
                }
            }
        };

        let duration = supplied.usable_duration().or(probed.usable_duration());
        let dimensions = supplied
            .usable_dimensions()
            .or(probed.usable_dimensions());

        let assembly = &ctx.settings.assembly;
        let output = ProbeOutput {
            probed,
            duration: duration.unwrap_or_else(|| Self::fallback_duration(ctx)),
            width: dimensions.map_or(assembly.fallback_width, |d| d.0),
            height: dimensions.map_or(assembly.fallback_height, |d| d.1),
            duration_fallback: duration.is_none(),
            dimensions_fallback: dimensions.is_none(),
        };

        if output.duration_fallback {
            ctx.logger.warn(&format!(
                "Video duration unknown, assuming {:.1}s",
                output.duration
            ));
        }
        if output.dimensions_fallback {
            ctx.logger.warn(&format!(
                "Video dimensions unknown, assuming {}x{}",
                output.width, output.height
            ));
        }
        ctx.logger.info(&format!(
            "Video: {:.3}s, {}x{}",
            output.duration, output.width, output.height
        ));

        state.probe = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.video_duration() {
            Some(d) if d.is_finite() && d > 0.0 => Ok(()),
            Some(d) => Err(StepError::invalid_output(format!(
                "video duration {} is not usable",
                d
            ))),
            None => Err(StepError::invalid_output("probe result not recorded")),
        }
    }
}
