//! Caller-level retry for transient completion failures
//!
//! Wraps any provider and retries only errors the [`ErrorClassifier`]
//! considers retryable (rate limits, network, 5xx). Backoff is exponential
//! with jitter via `backon`.
//!
//! This is independent of the writer's word-count retries: a section that
//! misses its band is re-requested by the pipeline, while a section whose
//! HTTP call failed is re-sent here.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use tracing::{instrument, warn};

use super::{CompletionRequest, LlmProvider, LlmResponse, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::constants::retry as retry_constants;
use crate::types::{DraftError, ErrorClassifier, Result};

/// Backoff settings for [`RetryingProvider`]
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// First backoff delay
    pub base_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
    /// Multiplier between attempts
    pub factor: f32,
    /// Limit on each individual attempt; a timed-out attempt is retried
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            factor: retry_constants::BACKOFF_FACTOR,
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Longest total sleep across all retries; jitter can double each delay
    pub fn worst_case_backoff(&self) -> Duration {
        self.max_delay
            .saturating_mul(2)
            .saturating_mul(self.max_retries as u32)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Provider decorator that retries transient failures
pub struct RetryingProvider {
    inner: SharedProvider,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn should_retry(&self, err: &DraftError) -> bool {
        ErrorClassifier::classify_error(err, self.inner.name()).is_retryable()
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    #[instrument(skip(self, request), fields(provider = %self.inner.name()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let inner = &self.inner;
        let attempt_timeout = self.config.attempt_timeout;

        (|| async move {
            match attempt_timeout {
                Some(limit) => {
                    with_timeout(limit, inner.complete(request), "completion attempt").await
                }
                None => inner.complete(request).await,
            }
        })
            .retry(self.config.backoff())
            .when(|err| self.should_retry(err))
            .notify(|err, delay| {
                warn!(
                    "Completion failed ({}), retrying in {:?}",
                    err,
                    delay
                );
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        failures: u32,
        message: &'static str,
    }

    impl FlakyProvider {
        fn new(failures: u32, message: &'static str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                message,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<LlmResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(DraftError::LlmApi(self.message.to_string()));
            }
            Ok(LlmResponse::content_only("ok"))
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn fast_config(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            factor: 2.0,
            attempt_timeout: None,
        }
    }

    /// Hangs on the first call, answers immediately afterwards
    struct StallingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for StallingProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<LlmResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(LlmResponse::content_only("ok"))
        }

        fn name(&self) -> &str {
            "stalling"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_attempt_timeout_applies_per_attempt() {
        let stalling = Arc::new(StallingProvider {
            calls: AtomicU32::new(0),
        });
        let provider = RetryingProvider::new(
            stalling.clone(),
            fast_config(2).with_attempt_timeout(Duration::from_millis(50)),
        );

        let started = std::time::Instant::now();
        let response = provider
            .complete(&CompletionRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(stalling.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_worst_case_backoff() {
        let config = RetryConfig::default().with_max_retries(2);
        assert_eq!(config.worst_case_backoff(), Duration::from_secs(120));
        assert_eq!(
            RetryConfig::default().with_max_retries(0).worst_case_backoff(),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let flaky = Arc::new(FlakyProvider::new(2, "503 service temporarily overloaded"));
        let provider = RetryingProvider::new(flaky.clone(), fast_config(3));

        let response = provider
            .complete(&CompletionRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let flaky = Arc::new(FlakyProvider::new(10, "connection reset"));
        let provider = RetryingProvider::new(flaky.clone(), fast_config(2));

        let result = provider.complete(&CompletionRequest::new("hello")).await;
        assert!(result.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_not_retried() {
        let flaky = Arc::new(FlakyProvider::new(10, "401 unauthorized: invalid api key"));
        let provider = RetryingProvider::new(flaky.clone(), fast_config(3));

        assert!(provider.complete(&CompletionRequest::new("x")).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
