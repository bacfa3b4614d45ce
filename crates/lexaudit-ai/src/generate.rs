//! The upstream text-generation seam.

use async_trait::async_trait;

use crate::error::UpstreamError;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// A black-box `prompt -> text` service.
///
/// Implementations must be safe to call concurrently; the fix orchestrator
/// issues several calls at once.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: GenerationParams)
    -> Result<String, UpstreamError>;
}
