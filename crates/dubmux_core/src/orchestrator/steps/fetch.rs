//! Fetch step - materializes the source video inside the job workspace.

use std::fs;
use std::path::Path;

use crate::collaborators::FetchError;
use crate::models::{AssetSource, JobStatus};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, SourceOutput, StepOutcome};

/// Copies, writes or downloads the source video to `source.<ext>`.
pub struct FetchStep;

impl FetchStep {
    pub fn new() -> Self {
        Self
    }

    fn target_name(source: &AssetSource) -> String {
        let ext = match source {
            AssetSource::File(path) => path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .filter(|e| !e.is_empty()),
            _ => None,
        };
        format!("source.{}", ext.as_deref().unwrap_or("mp4"))
    }
}

impl Default for FetchStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FetchStep {
    fn name(&self) -> &str {
        "Fetch"
    }

    fn description(&self) -> &str {
        "Materialize the source video in the job workspace"
    }

    fn status(&self) -> JobStatus {
        JobStatus::Probing
    }

    fn progress_band(&self) -> (f64, f64) {
        (0.0, 0.05)
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        match &ctx.request.video.source {
            AssetSource::Bytes(bytes) if bytes.is_empty() => {
                Err(StepError::fetch("video payload is empty"))
            }
            AssetSource::File(path) if !path.is_file() => Err(StepError::fetch(format!(
                "video file not found: {}",
                path.display()
            ))),
            AssetSource::Remote(handle) if ctx.collaborators.fetcher.is_none() => {
                Err(FetchError::NoFetcher(handle.clone()).into())
            }
            _ => Ok(()),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let source = &ctx.request.video.source;
        let target = ctx.work_file(&Self::target_name(source));
        ctx.logger.info(&format!("Source: {}", source.describe()));

        match source {
            AssetSource::Bytes(bytes) => write_source(&target, bytes)?,
            AssetSource::File(path) => {
                fs::copy(path, &target).map_err(|e| {
                    StepError::fetch(format!("copying {}: {}", path.display(), e))
                })?;
            }
            AssetSource::Remote(handle) => {
                let fetcher = ctx
                    .collaborators
                    .fetcher
                    .as_ref()
                    .ok_or_else(|| FetchError::NoFetcher(handle.clone()))?;
                let bytes = fetcher.fetch(handle)?;
                if bytes.is_empty() {
                    return Err(FetchError::Empty(handle.clone()).into());
                }
                write_source(&target, &bytes)?;
            }
        }

        let size = fs::metadata(&target)
            .map_err(|e| StepError::io("reading source metadata", e))?
            .len();
        ctx.logger
            .info(&format!("Source ready: {} ({} bytes)", target.display(), size));

        state.source = Some(SourceOutput { path: target, size });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.source {
            Some(ref source) if source.size > 0 => Ok(()),
            Some(_) => Err(StepError::fetch("source video is empty")),
            None => Err(StepError::invalid_output("source not recorded")),
        }
    }
}

fn write_source(target: &Path, bytes: &[u8]) -> StepResult<()> {
    fs::write(target, bytes).map_err(|e| StepError::io("writing source video", e))
}
