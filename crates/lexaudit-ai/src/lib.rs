//! Recovery pipeline from unreliable LLM output to typed compliance assessments.
//!
//! The upstream model sits behind [`TextGenerator`]; everything else here is
//! deterministic given its responses.

pub mod classifier;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fixes;
pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod references;
pub mod repair;
pub mod retry;

#[cfg(test)]
mod testing;

pub use classifier::{ClassificationSummary, GapClassifier};
pub use error::{AnalysisError, FixFailure, UpstreamError};
pub use extract::{Extraction, ExtractionMethod, extract};
pub use fixes::{FixOptions, FixOrchestrator};
pub use generate::{GenerationParams, TextGenerator};
pub use pipeline::{Analyzer, AnalyzerOptions};
pub use prompts::{AnalysisRequest, DocumentType, PromptTemplates};
pub use references::ReferenceResolver;
pub use retry::RetryPolicy;
