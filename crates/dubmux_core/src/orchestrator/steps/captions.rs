//! Captions step - raw transcript to a written ASS document.
//!
//! Optional: any failure here only costs the job its captions.

use std::fs;

use crate::captions::{correct_segments, parse_srt_segments, segment_captions};
use crate::models::{CaptionSource, JobStatus, RawSegment};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{CaptionsOutput, Context, JobState, StepOutcome};
use crate::subtitles::build_descriptor;

pub struct CaptionsStep;

impl CaptionsStep {
    pub fn new() -> Self {
        Self
    }

    fn raw_segments(
        ctx: &Context,
        state: &JobState,
        source: &CaptionSource,
    ) -> StepResult<Vec<RawSegment>> {
        match source {
            CaptionSource::Segments(segments) => Ok(segments.clone()),
            CaptionSource::Srt(text) => Ok(parse_srt_segments(text)?),
            CaptionSource::Transcribe => {
                let transcriber = ctx
                    .collaborators
                    .transcriber
                    .as_ref()
                    .ok_or_else(|| StepError::invalid_input("no transcriber configured"))?;
                let audio = state
                    .narration
                    .as_ref()
                    .map(|n| n.reconciled_path.as_path())
                    .ok_or_else(|| StepError::invalid_input("narration not reconciled"))?;
                transcriber
                    .transcribe(audio)
                    .map_err(|e| StepError::invalid_input(format!("transcription failed: {}", e)))
            }
        }
    }
}

impl Default for CaptionsStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CaptionsStep {
    fn name(&self) -> &str {
        "Captions"
    }

    fn description(&self) -> &str {
        "Segment the transcript and write the subtitle document"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Captioning
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.25, 0.30)
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.probe.is_none() {
            return Err(StepError::invalid_input("video not probed"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(ref source) = ctx.request.captions else {
            return Ok(StepOutcome::Skipped("no caption source".to_string()));
        };
        let Some(probe) = state.probe.clone() else {
            return Err(StepError::invalid_input("video not probed"));
        };

        let mut raw = Self::raw_segments(ctx, state, source)?;
        ctx.logger
            .info(&format!("Transcript has {} segments", raw.len()));

        let subtitles = &ctx.settings.subtitles;
        let mut corrected = false;
        if let Some(ref corrector) = ctx.collaborators.corrector {
            let outcome = correct_segments(
                corrector.as_ref(),
                &raw,
                ctx.request.script.as_deref(),
                subtitles.rounding,
            );
            match outcome.fallback_reason {
                Some(ref reason) => ctx
                    .logger
                    .warn(&format!("Keeping raw transcript: {}", reason)),
                None => ctx.logger.info("Transcript corrected"),
            }
            corrected = outcome.corrected;
            raw = outcome.segments;
        }

        let timeline = segment_captions(&raw, probe.duration)?;
        ctx.logger.info(&format!(
            "{} of {} segments kept after normalization",
            timeline.len(),
            raw.len()
        ));

        let descriptor_path = if timeline.is_empty() {
            ctx.logger.info("No captions fall inside the video");
            None
        } else {
            let descriptor = build_descriptor(&timeline, probe.width, probe.height, &subtitles.font_name)
                .with_rounding(subtitles.rounding);
            let path = ctx.work_file("captions.ass");
            fs::write(&path, descriptor.to_ass())
                .map_err(|e| StepError::io("writing subtitle document", e))?;
            ctx.logger.info(&format!(
                "Wrote {} events, font size {}",
                descriptor.event_count(),
                descriptor.style.font_size
            ));
            Some(path)
        };

        state.captions = Some(CaptionsOutput {
            timeline,
            descriptor_path,
            corrected,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let Some(ref captions) = state.captions else {
            return Err(StepError::invalid_output("captions not recorded"));
        };
        match captions.descriptor_path {
            Some(ref path) if !path.is_file() => Err(StepError::invalid_output(format!(
                "subtitle document missing: {}",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    fn discard_output(&self, state: &mut JobState) {
        state.captions = None;
    }
}
