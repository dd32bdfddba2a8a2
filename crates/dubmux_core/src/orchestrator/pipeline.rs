//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError, StepResult};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// Each step is validated before and after it runs. Cancellation is
/// checked at every step boundary.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Get a cancellation handle for this pipeline.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Share an existing handle, so a caller can cancel before the pipeline
    /// is even built.
    pub fn attach_cancel(mut self, handle: &CancelHandle) -> Self {
        self.cancelled = Arc::clone(&handle.flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run the pipeline.
    ///
    /// For each step:
    /// 1. Check for cancellation
    /// 2. Move the job to the step's status
    /// 3. Run `validate_input`, `execute`, `validate_output`
    ///
    /// A failing optional step is recorded as degraded and its output
    /// discarded; a failing required step stops the run.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            let step_name = step.name();

            if self.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                return Err(PipelineError::cancelled(&ctx.job_id));
            }

            if !state.advance(step.status()) {
                return Err(PipelineError::step_failed(
                    &ctx.job_id,
                    step_name,
                    StepError::invalid_input(format!(
                        "cannot move from {} to {}",
                        state.status,
                        step.status()
                    )),
                ));
            }

            ctx.logger.phase(step_name);
            let (band_start, band_end) = step.progress_band();
            ctx.report_progress(band_start, step.status().label());

            match run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
                Err(e) if step.is_optional() => {
                    ctx.logger
                        .warn(&format!("{} failed, continuing without it: {}", step_name, e));
                    step.discard_output(state);
                    result.steps_degraded.push(step_name.to_string());
                }
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", step_name, e));
                    return Err(PipelineError::step_failed(&ctx.job_id, step_name, e));
                }
            }

            ctx.report_progress(band_end, step.status().label());
        }

        ctx.logger.success("Pipeline completed");
        Ok(result)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn run_step(step: &dyn PipelineStep, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
    ctx.logger
        .debug(&format!("Validating input for '{}'", step.name()));
    step.validate_input(ctx, state)?;

    ctx.logger.debug(&format!("Executing '{}'", step.name()));
    let outcome = step.execute(ctx, state)?;

    if outcome == StepOutcome::Success {
        ctx.logger
            .debug(&format!("Validating output for '{}'", step.name()));
        step.validate_output(ctx, state)?;
    }
    Ok(outcome)
}

/// Handle for cancelling a pipeline at its next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
    /// Optional steps that failed and were left out.
    pub steps_degraded: Vec<String>,
}

impl PipelineRunResult {
    pub fn is_degraded(&self) -> bool {
        !self.steps_degraded.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len() + self.steps_degraded.len()
    }
}
