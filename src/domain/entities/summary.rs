use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::AlertKind;

/// Aggregated view over recorded alerts and the latest samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: u64,
    pub breakdown: BTreeMap<AlertKind, u64>,
    pub last_alert_timestamps: Vec<DateTime<Utc>>,
    pub avg_recent_cpu: f64,
    pub avg_recent_memory: f64,
}
