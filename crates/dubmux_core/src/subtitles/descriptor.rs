//! Render descriptor (ASS document) construction.
//!
//! Building is pure: the same timeline, geometry and font always produce
//! byte-identical output. Writing the document to disk is the caller's job.

use serde::{Deserialize, Serialize};

use crate::models::CaptionTimeline;

use super::style::{RenderStyle, RoundingMode};

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// One `Dialogue:` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A complete subtitle document: canvas, one style, ordered events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDescriptor {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub style: RenderStyle,
    pub events: Vec<DialogueEvent>,
    pub rounding: RoundingMode,
}

/// Build the descriptor for `timeline` on a `width` x `height` canvas.
pub fn build_descriptor(
    timeline: &CaptionTimeline,
    width: u32,
    height: u32,
    font_name: &str,
) -> RenderDescriptor {
    let events = timeline
        .segments()
        .iter()
        .map(|caption| DialogueEvent {
            start: caption.start,
            end: caption.end,
            text: caption.text.clone(),
        })
        .collect();

    RenderDescriptor {
        play_res_x: width,
        play_res_y: height,
        style: RenderStyle::for_width(width, font_name),
        events,
        rounding: RoundingMode::default(),
    }
}

impl RenderDescriptor {
    /// Use a different rounding mode for event times.
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// Number of events, including any `to_ass` leaves out for rounding to
    /// zero length.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Serialize to ASS text.
    pub fn to_ass(&self) -> String {
        let mut output = String::new();

        output.push_str("[Script Info]\n");
        output.push_str("ScriptType: v4.00+\n");
        output.push_str(&format!("PlayResX: {}\n", self.play_res_x));
        output.push_str(&format!("PlayResY: {}\n", self.play_res_y));
        output.push('\n');

        output.push_str("[V4+ Styles]\n");
        output.push_str(STYLE_FORMAT);
        output.push('\n');
        output.push_str(&self.style.to_ass_line());
        output.push('\n');
        output.push('\n');

        output.push_str("[Events]\n");
        output.push_str(EVENT_FORMAT);
        output.push('\n');

        // Events that round to zero length would never show.
        for event in self.events.iter().filter(|e| !self.collapses(e)) {
            output.push_str(&format!(
                "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
                format_ass_time(event.start, self.rounding),
                format_ass_time(event.end, self.rounding),
                self.style.name,
                escape_dialogue_text(&event.text)
            ));
        }

        output
    }

    fn collapses(&self, event: &DialogueEvent) -> bool {
        self.rounding.apply_cs(event.end * 1000.0) <= self.rounding.apply_cs(event.start * 1000.0)
    }
}

/// Format seconds as an ASS timestamp (`H:MM:SS.cc`).
pub fn format_ass_time(seconds: f64, rounding: RoundingMode) -> String {
    let cs = rounding.apply_cs(seconds * 1000.0);

    let centis = cs % 100;
    let total_secs = cs / 100;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, centis)
}

/// Keep caption text from opening override blocks.
fn escape_dialogue_text(text: &str) -> String {
    text.replace('{', "\\{").replace('}', "\\}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::segment_captions;
    use crate::models::RawSegment;

    fn timeline() -> CaptionTimeline {
        segment_captions(
            &[
                RawSegment::new(0.0, 2.5, "first"),
                RawSegment::new(2.5, 4.016, "second {tag}"),
                RawSegment::new(3661.5, 3662.0, "late"),
            ],
            4000.0,
        )
        .unwrap()
    }

    #[test]
    fn formats_ass_times() {
        assert_eq!(format_ass_time(0.0, RoundingMode::Round), "0:00:00.00");
        assert_eq!(format_ass_time(2.5, RoundingMode::Round), "0:00:02.50");
        assert_eq!(format_ass_time(4.016, RoundingMode::Round), "0:00:04.02");
        assert_eq!(format_ass_time(4.016, RoundingMode::Floor), "0:00:04.01");
        assert_eq!(format_ass_time(3661.5, RoundingMode::Round), "1:01:01.50");
    }

    #[test]
    fn document_has_all_sections_and_events() {
        let ass = build_descriptor(&timeline(), 1080, 1920, "FC Iconic").to_ass();

        assert!(ass.starts_with("[Script Info]\nScriptType: v4.00+\n"));
        assert!(ass.contains("PlayResX: 1080\nPlayResY: 1920\n"));
        assert!(ass.contains("[V4+ Styles]\n"));
        assert!(ass.contains("Style: Default,FC Iconic,124,"));
        assert!(ass.contains("[Events]\n"));
        assert!(ass.contains("Dialogue: 0,0:00:00.00,0:00:02.50,Default,,0,0,0,,first\n"));
        assert!(ass.contains("Dialogue: 0,0:00:02.50,0:00:04.02,Default,,0,0,0,,second \\{tag\\}\n"));
        assert!(ass.contains("Dialogue: 0,1:01:01.50,1:01:02.00,Default,,0,0,0,,late\n"));

        let first = ass.find(",first").unwrap();
        let late = ass.find(",late").unwrap();
        assert!(first < late);
    }

    #[test]
    fn empty_timeline_is_still_a_valid_document() {
        let empty = segment_captions(&[], 10.0).unwrap();
        let descriptor = build_descriptor(&empty, 720, 1280, "FC Iconic");
        let ass = descriptor.to_ass();

        assert_eq!(descriptor.event_count(), 0);
        assert!(ass.contains("[Script Info]"));
        assert!(ass.contains("[V4+ Styles]"));
        assert!(ass.ends_with(&format!("[Events]\n{}\n", EVENT_FORMAT)));
        assert!(!ass.contains("Dialogue:"));
    }

    #[test]
    fn events_rounding_to_zero_length_are_left_out() {
        let timeline = segment_captions(
            &[
                RawSegment::new(1.001, 1.004, "blink"),
                RawSegment::new(1.004, 2.0, "kept"),
            ],
            10.0,
        )
        .unwrap();
        let descriptor = build_descriptor(&timeline, 1080, 1920, "FC Iconic");
        let ass = descriptor.to_ass();

        assert_eq!(descriptor.event_count(), 2);
        assert!(!ass.contains("blink"));
        assert_eq!(ass.lines().filter(|l| l.starts_with("Dialogue:")).count(), 1);
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,kept\n"));
    }

    #[test]
    fn zero_length_check_follows_the_rounding_mode() {
        let timeline = segment_captions(&[RawSegment::new(1.001, 1.004, "blink")], 10.0).unwrap();
        let ass = build_descriptor(&timeline, 1080, 1920, "FC Iconic")
            .with_rounding(RoundingMode::Floor)
            .to_ass();
        assert!(!ass.contains("blink"));

        let timeline = segment_captions(&[RawSegment::new(1.001, 1.012, "short")], 10.0).unwrap();
        let ass = build_descriptor(&timeline, 1080, 1920, "FC Iconic")
            .with_rounding(RoundingMode::Ceil)
            .to_ass();
        assert!(ass.contains("Dialogue: 0,0:00:01.01,0:00:01.02,Default,,0,0,0,,short\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let a = build_descriptor(&timeline(), 1080, 1920, "FC Iconic").to_ass();
        let b = build_descriptor(&timeline(), 1080, 1920, "FC Iconic").to_ass();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
