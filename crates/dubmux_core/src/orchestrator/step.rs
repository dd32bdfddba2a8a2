//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::JobStatus;

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// A failure in any of the three fails the job, unless the step is
/// optional. Optional failures are logged, the step's output is discarded
/// through `discard_output`, and the job carries on.
///
/// # Example
///
/// ```ignore
/// struct ThumbnailStep;
///
/// impl PipelineStep for ThumbnailStep {
///     fn name(&self) -> &str { "Thumbnail" }
///     fn status(&self) -> JobStatus { JobStatus::Thumbnailing }
///     fn progress_band(&self) -> (f64, f64) { (0.95, 1.0) }
///     fn is_optional(&self) -> bool { true }
///
///     fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         state.final_output().map(|_| ()).ok_or_else(|| StepError::invalid_input("Nothing to capture"))
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
///         // ctx.toolkit.thumbnail(...)
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> { Ok(()) }
///
///     fn discard_output(&self, state: &mut JobState) { state.thumbnail = None; }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Job status while this step runs.
    fn status(&self) -> JobStatus;

    /// Share of overall progress `(start, end)` owned by this step.
    fn progress_band(&self) -> (f64, f64);

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Execute the step's main work and record results in `state`.
    ///
    /// Returns `StepOutcome::Skipped` when there is nothing to do (not an
    /// error).
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    /// Validate outputs after `execute` returned `Success`.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Whether a failure of this step degrades the job instead of failing it.
    fn is_optional(&self) -> bool {
        false
    }

    /// Drop whatever this step recorded, after it degraded.
    fn discard_output(&self, _state: &mut JobState) {}

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
