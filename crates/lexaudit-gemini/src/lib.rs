//! Gemini transport for the lexaudit recovery pipeline.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiError};
