//! Caption error types.

/// Errors raised while turning transcripts into a caption timeline.
///
/// The orchestrator surfaces every variant as a validation failure of the
/// captioning stage.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    /// A segment carries a NaN or infinite timestamp.
    #[error("Segment {index} has a non-finite timestamp ({start} --> {end})")]
    NonFiniteTimestamp { index: usize, start: f64, end: f64 },

    /// Segments are not sorted by start time.
    #[error("Segment {index} starts at {start} before the previous segment at {previous_start}")]
    OutOfOrder {
        index: usize,
        previous_start: f64,
        start: f64,
    },

    /// The video duration used as the upper bound is unusable.
    #[error("Video duration must be positive and finite, got {0}")]
    InvalidVideoDuration(f64),

    /// A transcript timing line could not be parsed.
    #[error("Invalid time format at line {line}: '{value}'")]
    InvalidTiming { line: usize, value: String },
}

impl CaptionError {
    pub fn invalid_timing(line: usize, value: impl Into<String>) -> Self {
        Self::InvalidTiming {
            line,
            value: value.into(),
        }
    }
}
