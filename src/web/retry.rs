//! Retry policy for outbound HTTP requests.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// When and how a request is retried
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try). 0 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Response status codes that trigger another attempt
    #[serde(default)]
    pub retryable_status_codes: Vec<u16>,

    /// Retry when the response content type does not contain this value
    #[serde(default)]
    pub expected_content_type: Option<String>,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Pick a random delay between the initial delay and the computed one
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    5000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retryable_status_codes: Vec::new(),
            expected_content_type: None,
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Builder-style: retry on these status codes
    pub fn with_retryable_status_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.retryable_status_codes = codes.into();
        self
    }

    /// Builder-style: require a content type
    pub fn with_expected_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.expected_content_type = Some(content_type.into());
        self
    }

    /// Calculate delay for a specific attempt (1-indexed), without jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms));
        }

        let delay = self.initial_delay_ms as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Delay to sleep before retrying after `attempt`, jittered if enabled
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.delay_for_attempt(attempt);
        if !self.jitter {
            return ceiling;
        }

        let floor = Duration::from_millis(self.initial_delay_ms).min(ceiling);
        if ceiling <= floor {
            return floor;
        }

        rand::thread_rng().gen_range(floor..=ceiling)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Whether this status code warrants another attempt
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Whether a response content type satisfies the expected one
    pub fn content_type_matches(&self, content_type: Option<&str>) -> bool {
        let Some(expected) = self.expected_content_type.as_deref() else {
            return true;
        };
        let actual = content_type.unwrap_or_default();

        actual.eq_ignore_ascii_case(expected)
            || actual.to_lowercase().contains(&expected.to_lowercase())
    }
}
