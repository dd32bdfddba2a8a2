//! Transcript correction round-trip.
//!
//! The raw transcript goes out as SRT, a [`TextCorrector`] fixes wording
//! against the narration script, and the answer is parsed back. Any failure
//! along the way keeps the raw transcript.

use crate::collaborators::TextCorrector;
use crate::models::RawSegment;
use crate::subtitles::RoundingMode;

use super::srt::{parse_srt_segments, write_srt_segments};

/// Result of a correction attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    pub segments: Vec<RawSegment>,
    /// Whether the corrected transcript was used.
    pub corrected: bool,
    /// Why the raw transcript was kept, if it was.
    pub fallback_reason: Option<String>,
}

impl CorrectionOutcome {
    fn kept(segments: &[RawSegment], reason: impl Into<String>) -> Self {
        Self {
            segments: segments.to_vec(),
            corrected: false,
            fallback_reason: Some(reason.into()),
        }
    }
}

/// Instructions sent along with the transcript.
pub fn correction_prompt(script: Option<&str>) -> String {
    let mut prompt = String::from(
        "Correct spelling and word errors in this SRT transcript. \
         Keep every index and timing line exactly as given, keep one entry per block, \
         and reply with SRT only.",
    );
    if let Some(script) = script.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nThe narration was read from this script:\n");
        prompt.push_str(script);
    }
    prompt
}

/// Run the transcript through `corrector`, falling back to `raw`.
pub fn correct_segments(
    corrector: &dyn TextCorrector,
    raw: &[RawSegment],
    script: Option<&str>,
    rounding: RoundingMode,
) -> CorrectionOutcome {
    if raw.is_empty() {
        return CorrectionOutcome::kept(raw, "transcript is empty");
    }

    let srt = write_srt_segments(raw, rounding);
    let reply = match corrector.correct(&srt, &correction_prompt(script)) {
        Ok(reply) => reply,
        Err(e) => return CorrectionOutcome::kept(raw, e.to_string()),
    };

    match parse_srt_segments(strip_code_fence(&reply)) {
        Ok(segments) if !segments.is_empty() => CorrectionOutcome {
            segments,
            corrected: true,
            fallback_reason: None,
        },
        Ok(_) => CorrectionOutcome::kept(raw, "corrected transcript has no entries"),
        Err(e) => CorrectionOutcome::kept(raw, format!("corrected transcript unreadable: {}", e)),
    }
}

/// Language models like to wrap answers in ``` fences.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorError;

    struct Replies(Result<String, String>);

    impl TextCorrector for Replies {
        fn correct(&self, text: &str, style_prompt: &str) -> Result<String, CollaboratorError> {
            assert!(text.contains("-->"));
            assert!(style_prompt.contains("SRT"));
            self.0
                .clone()
                .map_err(|m| CollaboratorError::new("corrector", m))
        }
    }

    fn raw() -> Vec<RawSegment> {
        vec![RawSegment::new(0.0, 1.5, "helo wrld")]
    }

    #[test]
    fn uses_corrected_transcript() {
        let corrector = Replies(Ok(
            "```srt\n1\n00:00:00,000 --> 00:00:01,500\nhello world\n```".to_string(),
        ));
        let outcome = correct_segments(&corrector, &raw(), Some("hello world"), RoundingMode::Round);
        assert!(outcome.corrected);
        assert_eq!(outcome.segments[0].text, "hello world");
    }

    #[test]
    fn service_failure_keeps_raw() {
        let corrector = Replies(Err("rate limited".to_string()));
        let outcome = correct_segments(&corrector, &raw(), None, RoundingMode::Round);
        assert!(!outcome.corrected);
        assert_eq!(outcome.segments, raw());
        assert!(outcome.fallback_reason.unwrap().contains("rate limited"));
    }

    #[test]
    fn unreadable_reply_keeps_raw() {
        let corrector = Replies(Ok("Sure! Here you go.".to_string()));
        let outcome = correct_segments(&corrector, &raw(), None, RoundingMode::Round);
        assert!(!outcome.corrected);
        assert_eq!(outcome.segments, raw());

        let corrector = Replies(Ok("1\n00:00:bad --> 00:00:01,500\nx\n".to_string()));
        let outcome = correct_segments(&corrector, &raw(), None, RoundingMode::Round);
        assert!(!outcome.corrected);
    }

    #[test]
    fn prompt_includes_script_when_present() {
        assert!(correction_prompt(Some("Once upon a time")).contains("Once upon a time"));
        assert!(!correction_prompt(Some("   ")).contains("script:"));
    }
}
