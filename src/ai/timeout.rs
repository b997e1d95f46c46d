//! Unified Timeout Configuration
//!
//! Operation-specific timeout defaults and helpers for wrapping async
//! operations so that a slow collaborator surfaces as
//! [`DraftError::Timeout`] instead of hanging the pipeline.
//!
//! ## Usage
//!
//! ```ignore
//! use draftsmith::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let text = with_timeout(
//!     config.completion,
//!     provider.complete(&request),
//!     "section completion",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::ai::provider::RetryConfig;
use crate::config::Config;
use crate::constants::{network as net_constants, research};
use crate::types::{DraftError, Result};

/// Timeout budget for each kind of external call
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One completion call, retries included
    pub completion: Duration,
    /// One image generation call
    pub image: Duration,
    /// One source search query
    pub search: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            completion: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            image: Duration::from_secs(net_constants::IMAGE_TIMEOUT_SECS),
            search: Duration::from_secs(research::QUERY_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    /// Derive timeouts from loaded configuration.
    ///
    /// The completion budget covers a whole retried call: every attempt at
    /// the per-attempt limit plus the worst-case backoff between them. The
    /// per-attempt limit itself is enforced by
    /// [`RetryingProvider`](crate::ai::provider::RetryingProvider).
    /// Searches are answered by the same retried completion client and get
    /// the same budget when it is larger.
    pub fn from_config(config: &Config) -> Self {
        let per_call = Duration::from_secs(config.llm.timeout_secs);
        let attempts = config.llm.max_retries as u32 + 1;
        let backoff = RetryConfig::default()
            .with_max_retries(config.llm.max_retries)
            .worst_case_backoff();
        let completion = per_call.saturating_mul(attempts).saturating_add(backoff);
        let defaults = Self::default();
        Self {
            completion,
            search: defaults.search.max(completion),
            ..defaults
        }
    }

    /// Short timeouts for tests and local models
    pub fn fast() -> Self {
        Self {
            completion: Duration::from_secs(30),
            image: Duration::from_secs(30),
            search: Duration::from_secs(5),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns [`DraftError::Timeout`] if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DraftError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.completion.as_secs(), 120);
        assert_eq!(config.search.as_secs(), 15);
        assert!(TimeoutConfig::fast().completion < config.completion);
    }

    #[test]
    fn test_from_config_covers_retries() {
        let mut config = Config::default();
        config.llm.timeout_secs = 10;
        config.llm.max_retries = 2;
        let timeouts = TimeoutConfig::from_config(&config);
        // 3 attempts of 10s plus 2 backoffs of at most 60s
        assert_eq!(timeouts.completion.as_secs(), 150);
        assert_eq!(timeouts.search, timeouts.completion);

        config.llm.timeout_secs = 5;
        config.llm.max_retries = 0;
        let single = TimeoutConfig::from_config(&config);
        assert_eq!(single.completion.as_secs(), 5);
        assert_eq!(single.search.as_secs(), 15);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, DraftError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, DraftError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), DraftError::Timeout { .. }));
    }
}
