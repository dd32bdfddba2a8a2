//! dubmux core - assembly logic for dubbed short-form video.
//!
//! This crate contains the whole media assembly pipeline with zero CLI
//! dependencies: duration reconciliation, caption segmentation, subtitle
//! render descriptors, and the encode orchestrator that ties them together.
//! External processes (`ffmpeg`/`ffprobe`) are reached only through the
//! [`media::MediaToolkit`] trait.

pub mod captions;
pub mod collaborators;
pub mod config;
pub mod logging;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod reconcile;
pub mod subtitles;
pub mod workspace;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
