//! Bounded retry with exponential backoff around an upstream call.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::generate::{GenerationParams, TextGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff slept after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Call `generator`, bounding each attempt by `timeout`.
    ///
    /// Non-retryable errors are returned as-is on first occurrence. Running
    /// out of attempts yields [`UpstreamError::Exhausted`].
    pub async fn generate(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
        params: GenerationParams,
        timeout: Duration,
    ) -> Result<String, UpstreamError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(timeout, generator.generate(prompt, params))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(UpstreamError::Timeout(timeout)),
            };

            let err = match outcome {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), "upstream call succeeded");
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(attempt, error = %err, "upstream call failed, not retrying");
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %err, "upstream retries exhausted");
                return Err(UpstreamError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let wait = self.backoff(attempt);
            warn!(attempt, error = %err, wait_ms = wait.as_millis() as u64, "upstream call failed, retrying");
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedGenerator};

    const PARAMS: GenerationParams = GenerationParams {
        temperature: 0.1,
        max_tokens: 1000,
    };

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let generator = ScriptedGenerator::new(|_, n| {
            if n < 2 {
                Reply::Fail(UpstreamError::Transport("reset".into()))
            } else {
                Reply::Text("{}".into())
            }
        });
        let started = tokio::time::Instant::now();
        let text = RetryPolicy::default()
            .generate(&generator, "p", PARAMS, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(text, "{}");
        assert_eq!(generator.calls(), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_carries_attempts_and_last_error() {
        let generator = ScriptedGenerator::failing();
        let err = RetryPolicy::default()
            .generate(&generator, "p", PARAMS, Duration::from_secs(30))
            .await
            .unwrap_err();
        match err {
            UpstreamError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, UpstreamError::Transport(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn quota_is_not_retried() {
        let generator =
            ScriptedGenerator::new(|_, _| Reply::Fail(UpstreamError::QuotaExceeded("rpm".into())));
        let err = RetryPolicy::default()
            .generate(&generator, "p", PARAMS, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::QuotaExceeded(_)));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out_and_retry() {
        let generator = ScriptedGenerator::new(|_, n| {
            if n == 0 {
                Reply::Hang
            } else {
                Reply::Text("ok".into())
            }
        });
        let text = RetryPolicy::default()
            .generate(&generator, "p", PARAMS, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(generator.calls(), 2);
    }
}
