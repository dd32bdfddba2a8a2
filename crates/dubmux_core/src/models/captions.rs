//! Caption structures before and after normalization.

use serde::{Deserialize, Serialize};

/// A transcript segment exactly as a transcription or correction service
/// produced it. Times are in seconds. No invariants hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RawSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// A normalized caption: `0 <= start < end <= video duration`, single line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered, non-overlapping captions (`end[i] <= start[i + 1]`).
///
/// Only the caption segmenter builds timelines, and deserialized timelines
/// are checked, so the invariant holds for every value of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedTimeline")]
pub struct CaptionTimeline {
    segments: Vec<CaptionSegment>,
}

#[derive(Deserialize)]
struct UncheckedTimeline {
    segments: Vec<CaptionSegment>,
}

impl TryFrom<UncheckedTimeline> for CaptionTimeline {
    type Error = String;

    fn try_from(value: UncheckedTimeline) -> Result<Self, Self::Error> {
        let mut previous_end = 0.0;
        for (index, caption) in value.segments.iter().enumerate() {
            if !caption.start.is_finite() || !caption.end.is_finite() {
                return Err(format!("caption {} has a non-finite time", index));
            }
            if caption.start < previous_end || caption.end <= caption.start {
                return Err(format!(
                    "caption {} ({}..{}) breaks timeline order",
                    index, caption.start, caption.end
                ));
            }
            previous_end = caption.end;
        }
        Ok(Self::from_normalized(value.segments))
    }
}

impl CaptionTimeline {
    pub(crate) fn from_normalized(segments: Vec<CaptionSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[CaptionSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// View the timeline as raw segments (for re-segmenting or SRT output).
    pub fn to_raw(&self) -> Vec<RawSegment> {
        self.segments
            .iter()
            .map(|s| RawSegment::new(s.start, s.end, s.text.clone()))
            .collect()
    }
}

/// Where a job's captions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionSource {
    /// Segments already produced by a collaborator.
    Segments(Vec<RawSegment>),
    /// SRT transcript text.
    Srt(String),
    /// Transcribe the reconciled narration with the configured `Transcriber`.
    Transcribe,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(start: f64, end: f64) -> CaptionSegment {
        CaptionSegment {
            start,
            end,
            text: "x".to_string(),
        }
    }

    #[test]
    fn serialized_timeline_reads_back() {
        let timeline = CaptionTimeline::from_normalized(vec![caption(0.0, 1.0), caption(1.0, 2.5)]);
        let json = serde_json::to_string(&timeline).unwrap();
        let back: CaptionTimeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, timeline);
    }

    #[test]
    fn overlapping_timeline_is_rejected() {
        let json = r#"{"segments":[
            {"start":0.0,"end":2.0,"text":"a"},
            {"start":1.0,"end":3.0,"text":"b"}
        ]}"#;
        let err = serde_json::from_str::<CaptionTimeline>(json).unwrap_err();
        assert!(err.to_string().contains("caption 1"));
    }

    #[test]
    fn inverted_or_negative_captions_are_rejected() {
        let inverted = r#"{"segments":[{"start":2.0,"end":1.0,"text":"a"}]}"#;
        assert!(serde_json::from_str::<CaptionTimeline>(inverted).is_err());

        let negative = r#"{"segments":[{"start":-1.0,"end":1.0,"text":"a"}]}"#;
        assert!(serde_json::from_str::<CaptionTimeline>(negative).is_err());
    }
}
