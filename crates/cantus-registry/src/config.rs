//! Configuration types for the registry client.

use std::time::Duration;

/// Default timeout for a single HTTP request.
///
/// Short enough that a retry still fits inside [`cantus_core::REGISTRY_TIMEOUT`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default wall-clock budget for all attempts of one operation, backoff included.
///
/// Kept below [`cantus_core::REGISTRY_TIMEOUT`] so a classified failure is
/// reported before the caller's deadline fires.
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(4);

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("cantus-registry/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

impl RegistryClientConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_backoff: Duration,

    /// Upper bound for a single delay (before jitter).
    pub max_backoff: Duration,

    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,

    /// Wall-clock budget shared by every attempt and delay.
    pub budget: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            jitter: Duration::from_millis(50),
            budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
            budget: DEFAULT_RETRY_BUDGET,
        }
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial and maximum backoff.
    #[must_use]
    pub const fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Sets the jitter bound.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the total budget for all attempts.
    #[must_use]
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Returns the delay before attempt `attempt + 1`, without jitter.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use cantus_registry::RetryConfig;
    ///
    /// let retry = RetryConfig::default();
    /// assert_eq!(retry.backoff(1), Duration::from_millis(100));
    /// assert_eq!(retry.backoff(2), Duration::from_millis(200));
    /// assert_eq!(retry.backoff(10), Duration::from_secs(2));
    /// ```
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RegistryClientConfig::new();
        assert_eq!(config.timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.user_agent.starts_with("cantus-registry/"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.budget, DEFAULT_RETRY_BUDGET);
    }

    #[test]
    fn test_default_budget_fits_caller_deadline() {
        let retry = RetryConfig::default();
        assert!(retry.budget < cantus_core::REGISTRY_TIMEOUT);
        // A timed-out first attempt still leaves room for a retry.
        assert!(DEFAULT_REQUEST_TIMEOUT + retry.backoff(1) + retry.jitter < retry.budget);
    }

    #[test]
    fn test_config_builders() {
        let config = RegistryClientConfig::new()
            .with_timeout(Duration::from_secs(1))
            .with_user_agent("test")
            .with_retry(RetryConfig::none());

        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.user_agent, "test");
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryConfig::default()
            .with_backoff(Duration::from_millis(500), Duration::from_secs(1));

        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_secs(1));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_secs(1));
    }
}
