//! External services the pipeline consumes but does not implement.
//!
//! Network fetching, speech-to-text and text correction live outside this
//! crate. Each is a small capability trait; the orchestrator only sees the
//! trait objects bundled in [`Collaborators`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::models::RawSegment;

/// Failure to obtain a remote source asset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No fetcher configured for remote asset '{0}'")]
    NoFetcher(String),

    #[error("Failed to fetch '{handle}': {message}")]
    Failed { handle: String, message: String },

    #[error("Fetched asset '{0}' is empty")]
    Empty(String),
}

impl FetchError {
    pub fn failed(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            handle: handle.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by a transcription or correction service.
#[derive(Debug, thiserror::Error)]
#[error("{service} failed: {message}")]
pub struct CollaboratorError {
    pub service: String,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Resolves a remote handle (URL, share link, ...) to the asset bytes.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, handle: &str) -> Result<Vec<u8>, FetchError>;
}

/// Speech-to-text over an audio file.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &Path) -> Result<Vec<RawSegment>, CollaboratorError>;
}

/// Rewrites transcript text (SRT in, SRT out) following a style prompt.
pub trait TextCorrector: Send + Sync {
    fn correct(&self, text: &str, style_prompt: &str) -> Result<String, CollaboratorError>;
}

/// The set of collaborators available to a job. All are optional.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub fetcher: Option<Arc<dyn AssetFetcher>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub corrector: Option<Arc<dyn TextCorrector>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_corrector(mut self, corrector: Arc<dyn TextCorrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("fetcher", &self.fetcher.is_some())
            .field("transcriber", &self.transcriber.is_some())
            .field("corrector", &self.corrector.is_some())
            .finish()
    }
}
