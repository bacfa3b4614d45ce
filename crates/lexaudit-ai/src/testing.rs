//! In-process `TextGenerator` doubles for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::generate::{GenerationParams, TextGenerator};

/// What a scripted call does.
pub(crate) enum Reply {
    Text(String),
    Fail(UpstreamError),
    /// Never completes; only a timeout ends the call.
    Hang,
    Delayed(Duration, String),
}

type Script = Box<dyn Fn(&str, usize) -> Reply + Send + Sync>;

/// Answers each call from a closure over `(prompt, call_index)`.
pub(crate) struct ScriptedGenerator {
    script: Script,
    calls: AtomicUsize,
    params: Mutex<Vec<GenerationParams>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(script: impl Fn(&str, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            params: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Reply::Text(text.clone()))
    }

    pub(crate) fn failing() -> Self {
        Self::new(|_, _| Reply::Fail(UpstreamError::Transport("connection refused".into())))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn temperatures(&self) -> Vec<f32> {
        self.params
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.temperature)
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.params.lock().unwrap().push(params);
        match (self.script)(prompt, n) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                std::future::pending::<()>().await;
                Err(UpstreamError::EmptyResponse)
            }
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}
