//! Caption intake and normalization.
//!
//! This module provides:
//! - The caption segmenter (overlap resolution, clamping, flattening)
//! - SRT parsing/writing for exchange with transcription services
//! - The text-correction round-trip with raw-transcript fallback
//!
//! # Example
//!
//! ```
//! use dubmux_core::captions::segment_captions;
//! use dubmux_core::models::RawSegment;
//!
//! let raw = vec![
//!     RawSegment::new(0.0, 3.0, "a"),
//!     RawSegment::new(2.5, 5.0, "b"),
//! ];
//! let timeline = segment_captions(&raw, 10.0).unwrap();
//! assert_eq!(timeline.segments()[0].end, 2.5);
//! ```

mod correction;
mod error;
mod segmenter;
mod srt;

pub use correction::{correct_segments, correction_prompt, CorrectionOutcome};
pub use error::CaptionError;
pub use segmenter::{flatten_text, segment_captions};
pub use srt::{format_srt_time, parse_srt_segments, parse_srt_time, write_srt_segments};
