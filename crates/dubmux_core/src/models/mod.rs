//! Data models for dubmux.
//!
//! This module contains the core data structures shared across the pipeline:
//! - Media assets (source video, narration PCM, probed metadata)
//! - Caption segments before and after normalization
//! - Job status state machine and the finished job snapshot

mod captions;
mod jobs;
mod media;

pub use captions::{CaptionSegment, CaptionSource, CaptionTimeline, RawSegment};
pub use jobs::{AssemblyJob, AssemblyRequest, ErrorKind, FinalAsset, FinalSource, JobKind, JobStatus};
pub use media::{AssetSource, MediaAsset, MediaInfo, NarrationAsset, PcmFormat};
