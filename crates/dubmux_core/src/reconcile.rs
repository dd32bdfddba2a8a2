//! Narration/video duration reconciliation.
//!
//! The narration track must end exactly where the video ends. Small
//! differences are tolerated; otherwise the narration is padded with
//! silence or hard-trimmed. Tempo is never changed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::media::{MediaToolkit, ToolResult};

/// Default tolerance in seconds below which the narration is left alone.
pub const DEFAULT_DESYNC_TOLERANCE: f64 = 0.5;

/// What to do with the narration track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Within tolerance.
    Unchanged,
    /// Append this many seconds of silence.
    Pad { seconds: f64 },
    /// Cut to exactly this duration from the start.
    Trim { duration: f64 },
}

impl ReconcileAction {
    /// Duration of the narration after applying this action.
    pub fn resulting_duration(&self, narration_duration: f64) -> f64 {
        match *self {
            ReconcileAction::Unchanged => narration_duration,
            ReconcileAction::Pad { seconds } => narration_duration + seconds,
            ReconcileAction::Trim { duration } => duration,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ReconcileAction::Unchanged)
    }

    pub fn describe(&self) -> String {
        match self {
            ReconcileAction::Unchanged => "unchanged".to_string(),
            ReconcileAction::Pad { seconds } => format!("pad {:.3}s of silence", seconds),
            ReconcileAction::Trim { duration } => format!("trim to {:.3}s", duration),
        }
    }
}

/// Decide how to bring `narration_duration` in line with `video_duration`.
pub fn plan_reconciliation(
    video_duration: f64,
    narration_duration: f64,
    tolerance: f64,
) -> ReconcileAction {
    let delta = video_duration - narration_duration;
    if delta.abs() < tolerance {
        ReconcileAction::Unchanged
    } else if delta > 0.0 {
        ReconcileAction::Pad { seconds: delta }
    } else {
        ReconcileAction::Trim {
            duration: video_duration,
        }
    }
}

/// Apply `action` to `input`, writing `output`.
///
/// Returns the path holding the reconciled narration, which is `input`
/// itself when nothing had to change.
pub fn apply_reconciliation<'a>(
    toolkit: &dyn MediaToolkit,
    input: &'a Path,
    output: &'a Path,
    action: ReconcileAction,
) -> ToolResult<&'a Path> {
    match action {
        ReconcileAction::Unchanged => Ok(input),
        ReconcileAction::Pad { seconds } => {
            toolkit.pad_audio(input, seconds, output)?;
            Ok(output)
        }
        ReconcileAction::Trim { duration } => {
            toolkit.trim_audio(input, duration, output)?;
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fake::{Op, ScriptedToolkit};
    use crate::models::PcmFormat;

    #[test]
    fn shorter_narration_is_padded_to_video_length() {
        let action = plan_reconciliation(12.0, 9.0, DEFAULT_DESYNC_TOLERANCE);
        assert_eq!(action, ReconcileAction::Pad { seconds: 3.0 });
        assert_eq!(action.resulting_duration(9.0), 12.0);
    }

    #[test]
    fn longer_narration_is_trimmed_to_video_length() {
        let action = plan_reconciliation(12.0, 13.0, DEFAULT_DESYNC_TOLERANCE);
        assert_eq!(action, ReconcileAction::Trim { duration: 12.0 });
        assert_eq!(action.resulting_duration(13.0), 12.0);
    }

    #[test]
    fn small_overshoot_is_left_for_the_mux_to_cut() {
        let action = plan_reconciliation(12.0, 12.3, DEFAULT_DESYNC_TOLERANCE);
        assert!(action.is_unchanged());
        assert_eq!(action.resulting_duration(12.3), 12.3);
    }

    #[test]
    fn tolerance_boundary() {
        assert!(plan_reconciliation(12.0, 11.6, 0.5).is_unchanged());
        assert!(plan_reconciliation(12.0, 12.49, 0.5).is_unchanged());
        assert_eq!(
            plan_reconciliation(12.0, 11.5, 0.5),
            ReconcileAction::Pad { seconds: 0.5 }
        );
        assert_eq!(
            plan_reconciliation(12.0, 12.5, 0.5),
            ReconcileAction::Trim { duration: 12.0 }
        );
    }

    #[test]
    fn reconciled_duration_matches_video_outside_tolerance() {
        for video in [3.0, 10.0, 12.0, 59.9] {
            for narration in [0.5, 2.9, 9.0, 12.3, 61.0] {
                let action = plan_reconciliation(video, narration, 0.5);
                let result = action.resulting_duration(narration);
                if (video - narration).abs() >= 0.5 {
                    assert!((result - video).abs() < 1e-9, "{video} vs {narration}");
                } else {
                    assert_eq!(result, narration);
                }
            }
        }
    }

    #[test]
    fn apply_goes_through_toolkit() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = ScriptedToolkit::new(12.0, 9.0);
        let wav = dir.path().join("narration.wav");
        let out = dir.path().join("reconciled.wav");
        toolkit
            .pcm_to_wav(Path::new("n.pcm"), PcmFormat::default(), &wav)
            .unwrap();

        let path = apply_reconciliation(&toolkit, &wav, &out, ReconcileAction::Pad { seconds: 3.0 })
            .unwrap();
        assert_eq!(path, out.as_path());
        assert_eq!(toolkit.probe(path).unwrap().duration, Some(12.0));

        let unchanged = apply_reconciliation(&toolkit, &wav, &out, ReconcileAction::Unchanged).unwrap();
        assert_eq!(unchanged, wav.as_path());
    }

    #[test]
    fn apply_surfaces_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = ScriptedToolkit::new(12.0, 12.3).failing(Op::Trim);
        let err = apply_reconciliation(
            &toolkit,
            &dir.path().join("a.wav"),
            &dir.path().join("b.wav"),
            ReconcileAction::Trim { duration: 12.0 },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }
}
