use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to the upstream text generator.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("upstream quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("response blocked by upstream content filter ({reason})")]
    Blocked { reason: String },
    #[error("upstream returned an empty response")]
    EmptyResponse,
    #[error("prompt rejected by upstream: {0}")]
    InvalidPrompt(String),
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream call failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Quota, content blocks, empty responses and rejected prompts are
    /// deterministic for a given prompt and are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Server { status, .. } => *status >= 500 || *status == 408,
            Self::QuotaExceeded(_)
            | Self::Blocked { .. }
            | Self::EmptyResponse
            | Self::InvalidPrompt(_)
            | Self::Exhausted { .. } => false,
        }
    }
}

/// Hard failure of an analysis. Everything past the primary call degrades
/// instead of failing.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("document text is empty")]
    EmptyDocument,
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
}

/// Why a single fix enrichment fell back to the deterministic fix.
#[derive(Error, Debug)]
pub enum FixFailure {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("fix call timed out after {0:?}")]
    Timeout(Duration),
    #[error("fix response could not be parsed: {0}")]
    Unparseable(&'static str),
}
