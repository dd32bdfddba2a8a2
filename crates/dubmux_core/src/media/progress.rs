//! Parser for ffmpeg's `-progress` key/value stream.
//!
//! With `-progress pipe:1 -nostats` ffmpeg writes blocks such as:
//! ```text
//! frame=120
//! out_time_us=4000000
//! out_time_ms=4000000
//! out_time=00:00:04.000000
//! progress=continue
//! ```
//! `out_time_ms` is in microseconds despite its name.

/// Elapsed output time in seconds, if `line` carries one.
///
/// `N/A` values (emitted before the first frame) and negative offsets are
/// ignored.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key.trim() {
        "out_time_us" | "out_time_ms" => {
            let value = value.trim();
            if value == "N/A" {
                return None;
            }
            value
                .parse::<i64>()
                .ok()
                .filter(|us| *us >= 0)
                .map(|us| us as f64 / 1_000_000.0)
        }
        _ => None,
    }
}
