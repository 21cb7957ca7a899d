use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_SECS: f64 = 1.0;
pub const DEFAULT_MAX_JITTER_SECS: f64 = 0.5;

/// Exponential backoff parameters for a retrying channel.
///
/// The wait before retry `n + 1` (after attempt `n` failed, `n` from 0) is
/// `backoff_base * 2^n` plus a jitter drawn uniformly from `[0, max_jitter]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Seconds.
    pub backoff_base: f64,
    /// Seconds.
    pub max_jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_SECS,
            max_jitter: DEFAULT_MAX_JITTER_SECS,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, backoff_base: f64) -> Self {
        Self {
            max_retries,
            backoff_base,
            max_jitter: DEFAULT_MAX_JITTER_SECS,
        }
    }

    /// One initial attempt plus every retry.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before the retry following failed attempt `attempt`, without jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        secs_to_duration(self.backoff_base * 2f64.powi(exp))
    }

    /// Wait before the retry following failed attempt `attempt`.
    /// `jitter` is clamped into `[0, max_jitter]`.
    #[must_use]
    pub fn delay(&self, attempt: u32, jitter: f64) -> Duration {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, self.max_jitter.max(0.0))
        } else {
            0.0
        };
        self.base_delay(attempt)
            .saturating_add(secs_to_duration(jitter))
    }
}

/// Non-positive and NaN map to zero; anything too large for a `Duration`
/// (including `+inf`) saturates.
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Per-delivery retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Attempt `n` (0-based) is about to run.
    Attempting(u32),
    Succeeded,
    Exhausted,
}

impl DeliveryState {
    #[must_use]
    pub const fn initial() -> Self {
        Self::Attempting(0)
    }

    #[must_use]
    pub const fn on_success(self) -> Self {
        match self {
            Self::Attempting(_) => Self::Succeeded,
            other => other,
        }
    }

    #[must_use]
    pub const fn on_failure(self, policy: &RetryPolicy) -> Self {
        match self {
            Self::Attempting(n) if n < policy.max_retries => Self::Attempting(n + 1),
            Self::Attempting(_) => Self::Exhausted,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}
