use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{Alert, AlertKind};

/// Ephemeral notification derived 1:1 from an alert at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: AlertKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl NotificationEvent {
    #[must_use]
    pub const fn from_alert(alert: &Alert, generated_at: DateTime<Utc>) -> Self {
        Self {
            kind: alert.kind,
            value: alert.value,
            timestamp: alert.timestamp,
            generated_at,
        }
    }
}

/// Result of one delivery attempt on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    /// Failed, another attempt is scheduled.
    TransientFailure(String),
    /// Failed, no further attempt will be made.
    TerminalFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub channel: &'static str,
    /// 1-based.
    pub attempt_number: u32,
    pub outcome: DeliveryOutcome,
}

/// Transient record of every attempt a channel made for a single event.
/// Discarded once the fan-out completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub channel: &'static str,
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    #[must_use]
    pub const fn new(channel: &'static str) -> Self {
        Self {
            channel,
            attempts: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: DeliveryOutcome) {
        let attempt_number = u32::try_from(self.attempts.len() + 1).unwrap_or(u32::MAX);
        self.attempts.push(DeliveryAttempt {
            channel: self.channel,
            attempt_number,
            outcome,
        });
    }

    /// Single-attempt report, for channels without a retry policy.
    #[must_use]
    pub fn single(channel: &'static str, result: Result<(), String>) -> Self {
        let mut report = Self::new(channel);
        report.record(match result {
            Ok(()) => DeliveryOutcome::Success,
            Err(reason) => DeliveryOutcome::TerminalFailure(reason),
        });
        report
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(
            self.attempts.last().map(|a| &a.outcome),
            Some(DeliveryOutcome::Success)
        )
    }

    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Reason of the final failed attempt, if the delivery failed.
    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        match self.attempts.last().map(|a| &a.outcome) {
            Some(
                DeliveryOutcome::TerminalFailure(reason) | DeliveryOutcome::TransientFailure(reason),
            ) => Some(reason),
            _ => None,
        }
    }
}
