//! External media tool access.
//!
//! The pipeline never spawns processes directly. Everything goes through
//! [`MediaToolkit`], implemented for real binaries by [`FfmpegToolkit`].

mod error;
mod ffmpeg;
pub mod process;
mod progress;
mod toolkit;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{ToolError, ToolResult};
pub use ffmpeg::{
    args_to_string, burn_args, escape_filter_path, mux_args, pad_args, parse_probe_json,
    pcm_to_wav_args, probe_args, thumbnail_args, trim_args, FfmpegToolkit,
};
pub use progress::parse_progress_line;
pub use toolkit::{BurnRequest, MediaToolkit, MuxRequest, ThumbnailRequest};
