use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw utilization reading returned by a sample source, before the
/// collector stamps it with the tick time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationReading {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// One instantaneous utilization sample. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    #[must_use]
    pub const fn new(reading: UtilizationReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            cpu_percent: reading.cpu_percent,
            memory_percent: reading.memory_percent,
            timestamp,
        }
    }
}
