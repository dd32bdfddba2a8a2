//! Caption segmenter.
//!
//! Turns raw transcript segments into a [`CaptionTimeline`]: single-line
//! text, no overlaps, everything inside `[0, video_duration]`.
//!
//! The pass is a single left-to-right walk:
//!
//! 1. A start earlier than the previous caption's end is pushed forward.
//! 2. An end later than the *raw* start of the next segment is pulled back.
//! 3. Segments left with `end <= start` are dropped.
//! 4. The first segment starting at or after the video end stops the walk.
//! 5. The surviving end is clamped to the video duration.

use crate::models::{CaptionSegment, CaptionTimeline, RawSegment};

use super::error::CaptionError;

/// Normalize raw segments into a non-overlapping timeline.
///
/// Input must be sorted by start time and use finite timestamps; anything
/// else is rejected rather than silently reordered.
pub fn segment_captions(
    segments: &[RawSegment],
    video_duration: f64,
) -> Result<CaptionTimeline, CaptionError> {
    if !video_duration.is_finite() || video_duration <= 0.0 {
        return Err(CaptionError::InvalidVideoDuration(video_duration));
    }
    validate_segments(segments)?;

    let mut captions = Vec::with_capacity(segments.len());
    let mut last_end = 0.0_f64;

    for (i, segment) in segments.iter().enumerate() {
        let mut start = segment.start;
        let mut end = segment.end;

        if start < last_end {
            start = last_end;
        }
        if let Some(next) = segments.get(i + 1) {
            if next.start < end {
                end = next.start;
            }
        }
        if end <= start {
            continue;
        }
        if start >= video_duration {
            break;
        }
        end = end.min(video_duration);

        captions.push(CaptionSegment {
            start,
            end,
            text: flatten_text(&segment.text),
        });
        last_end = end;
    }

    Ok(CaptionTimeline::from_normalized(captions))
}

fn validate_segments(segments: &[RawSegment]) -> Result<(), CaptionError> {
    let mut previous_start: Option<f64> = None;

    for (index, segment) in segments.iter().enumerate() {
        if !segment.start.is_finite() || !segment.end.is_finite() {
            return Err(CaptionError::NonFiniteTimestamp {
                index,
                start: segment.start,
                end: segment.end,
            });
        }
        if let Some(previous) = previous_start {
            if segment.start < previous {
                return Err(CaptionError::OutOfOrder {
                    index,
                    previous_start: previous,
                    start: segment.start,
                });
            }
        }
        previous_start = Some(segment.start);
    }

    Ok(())
}

/// Join line breaks into single spaces and collapse whitespace.
///
/// Handles real newlines as well as the ASS `\N` and `\n` escapes.
pub fn flatten_text(text: &str) -> String {
    let unescaped = text.replace("\\N", " ").replace("\\n", " ");
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}
