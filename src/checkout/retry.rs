//! Retry policy for checkout commits

use std::time::Duration;

use crate::config::CheckoutConfig;
use crate::core::error::ShopError;

/// Backoff strategy between attempts
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Retry immediately
    None,
    /// Same delay before every retry
    Fixed(Duration),
    /// `step`, `2 * step`, `3 * step`, ... capped at `max`
    Linear { step: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (1 for the first retry)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Linear { step, max } => std::cmp::min(step.saturating_mul(retry), *max),
        }
    }
}

/// How many times, and how patiently, a retryable failure is re-attempted
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (never below 1)
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffStrategy::Linear {
                step: Duration::from_millis(25),
                max: Duration::from_millis(250),
            },
        }
    }

    /// A single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffStrategy::None,
        }
    }

    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    pub fn from_config(config: &CheckoutConfig) -> Self {
        let step = Duration::from_millis(config.retry_backoff_ms);
        Self::new(config.max_attempts).with_backoff(BackoffStrategy::Linear {
            step,
            max: step.saturating_mul(10),
        })
    }

    /// Whether `error`, raised on attempt number `attempt` (1-based), should
    /// be followed by another attempt
    pub fn should_retry(&self, error: &ShopError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CheckoutConfig::default())
    }
}
