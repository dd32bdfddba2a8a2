//! Subtitle render descriptors.
//!
//! A caption timeline plus frame geometry becomes an ASS document with a
//! single shared style sized from the frame width. The burn step hands the
//! document to ffmpeg's `ass` filter.

mod descriptor;
mod style;

pub use descriptor::{build_descriptor, format_ass_time, DialogueEvent, RenderDescriptor};
pub use style::{font_size_for_width, AssColor, RenderStyle, RoundingMode, FONT_SIZE_RATIO, MIN_FONT_SIZE};
