//! SRT transcript exchange.
//!
//! Transcription and text-correction services speak SubRip. Entries look
//! like:
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! Hello, world!
//! ```
//! The index line is optional on input and regenerated on output. Times are
//! carried as seconds.

use crate::models::RawSegment;
use crate::subtitles::RoundingMode;

use super::error::CaptionError;

/// Parse SRT content into raw segments.
///
/// Blocks without a timing line are ignored. A timing line that is present
/// but malformed fails the whole parse. Multi-line text is kept as-is;
/// flattening happens in the segmenter.
pub fn parse_srt_segments(content: &str) -> Result<Vec<RawSegment>, CaptionError> {
    let content = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut segments = Vec::new();
    let mut line_offset = 0;

    for block in content.split("\n\n") {
        let block_line_count = block.lines().count().max(1);
        let lines: Vec<&str> = block.lines().map(str::trim_end).collect();

        if let Some((timing_idx, timing_line)) = find_timing_line(&lines) {
            let (start, end) = parse_srt_timing(timing_line).ok_or_else(|| {
                CaptionError::invalid_timing(line_offset + timing_idx + 1, timing_line)
            })?;

            let text = lines[timing_idx + 1..]
                .iter()
                .copied()
                .filter(|l| !l.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            if !text.is_empty() {
                segments.push(RawSegment::new(start, end, text));
            }
        }

        line_offset += block_line_count + 1;
    }

    Ok(segments)
}

/// Render segments as SRT (1-based indices, millisecond precision).
pub fn write_srt_segments(segments: &[RawSegment], rounding: RoundingMode) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start, rounding),
            format_srt_time(segment.end, rounding)
        ));
        output.push_str(&segment.text);
        output.push('\n');
    }

    output
}

fn find_timing_line<'a>(lines: &[&'a str]) -> Option<(usize, &'a str)> {
    lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.contains("-->"))
        .map(|(i, line)| (i, *line))
}

/// Parse `HH:MM:SS,mmm --> HH:MM:SS,mmm` into seconds.
fn parse_srt_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    // Some producers append positioning after the end time
    let end = end.split_whitespace().next()?;
    Some((parse_srt_time(start)?, parse_srt_time(end)?))
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm` or `HH:MM:SS.mmm`) into seconds.
pub fn parse_srt_time(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', ".");

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;

    let (secs, frac) = match parts[2].split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (parts[2], ""),
    };
    let seconds: u64 = secs.parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let fraction = if frac.is_empty() {
        0.0
    } else {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let value: f64 = frac.parse().ok()?;
        value / 10f64.powi(frac.len() as i32)
    };

    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    Some(whole as f64 + fraction)
}

/// Format seconds as an SRT timestamp.
pub fn format_srt_time(seconds: f64, rounding: RoundingMode) -> String {
    let ms = rounding.apply_ms(seconds.max(0.0) * 1000.0) as u64;

    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}
