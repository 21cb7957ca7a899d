use crate::domain::entities::summary::AlertSummary;
use crate::domain::ports::store::{AlertStore, SampleStore, StoreError};

/// Number of latest samples averaged into the summary.
pub const RECENT_SAMPLE_WINDOW: usize = 10;

/// Build an [`AlertSummary`] from the stores.
///
/// `last_n` bounds the list of latest alert timestamps. Averages are taken
/// over the last [`RECENT_SAMPLE_WINDOW`] samples and are `0.0` when no
/// sample has been recorded.
///
/// # Errors
///
/// Returns `StoreError` if any store read fails.
pub fn summarize(
    samples: &dyn SampleStore,
    alerts: &dyn AlertStore,
    last_n: usize,
) -> Result<AlertSummary, StoreError> {
    let breakdown = alerts.alert_counts()?;
    let total_alerts = breakdown.values().sum();

    let last_alert_timestamps = alerts
        .recent_alerts(last_n)?
        .into_iter()
        .map(|a| a.timestamp)
        .collect();

    let recent = samples.recent_samples(RECENT_SAMPLE_WINDOW)?;
    let (avg_recent_cpu, avg_recent_memory) = if recent.is_empty() {
        (0.0, 0.0)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = recent.len() as f64;
        let cpu: f64 = recent.iter().map(|s| s.cpu_percent).sum();
        let memory: f64 = recent.iter().map(|s| s.memory_percent).sum();
        (cpu / n, memory / n)
    };

    Ok(AlertSummary {
        total_alerts,
        breakdown,
        last_alert_timestamps,
        avg_recent_cpu,
        avg_recent_memory,
    })
}
