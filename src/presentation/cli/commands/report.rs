use colored::Colorize;
use serde::Serialize;

use crate::application::services::report::{summarize, RECENT_SAMPLE_WINDOW};
use crate::domain::entities::alert::Alert;
use crate::domain::entities::sample::Sample;
use crate::domain::entities::summary::AlertSummary;
use crate::domain::ports::store::{AlertStore, SampleStore};
use crate::domain::value_objects::thresholds::ThresholdPair;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_percent, kind_badge, print_section_header,
};

#[derive(Serialize)]
struct ReportOutput {
    summary: AlertSummary,
    recent_alerts: Vec<Alert>,
    recent_samples: Vec<Sample>,
}

fn build_report(
    samples: &dyn SampleStore,
    alerts: &dyn AlertStore,
    sample_limit: usize,
    alert_limit: usize,
) -> anyhow::Result<ReportOutput> {
    let summary = summarize(samples, alerts, alert_limit)
        .map_err(|e| anyhow::anyhow!("failed to build summary: {e}"))?;
    let recent_alerts = alerts
        .recent_alerts(alert_limit)
        .map_err(|e| anyhow::anyhow!("failed to read alerts: {e}"))?;
    let recent_samples = samples
        .recent_samples(sample_limit)
        .map_err(|e| anyhow::anyhow!("failed to read samples: {e}"))?;
    Ok(ReportOutput {
        summary,
        recent_alerts,
        recent_samples,
    })
}

/// Print the alert summary plus the latest alerts and samples.
///
/// # Errors
///
/// Returns an error if a store read or JSON serialization fails.
pub fn run_report(
    samples: &dyn SampleStore,
    alerts: &dyn AlertStore,
    thresholds: ThresholdPair,
    sample_limit: usize,
    alert_limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let report = build_report(samples, alerts, sample_limit, alert_limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_human(&report, thresholds);
    }
    Ok(())
}

fn print_report_human(report: &ReportOutput, thresholds: ThresholdPair) {
    let summary = &report.summary;
    print_section_header("Alert report");

    println!("{}", "Summary".bold().underline());
    println!(
        "  Total: {} alert(s)",
        summary.total_alerts.to_string().bold()
    );
    for (kind, count) in &summary.breakdown {
        println!("  {} {count}", kind_badge(*kind));
    }
    println!(
        "  Avg CPU (last {RECENT_SAMPLE_WINDOW}):    {}",
        colorize_percent(summary.avg_recent_cpu, thresholds.cpu_threshold)
    );
    println!(
        "  Avg memory (last {RECENT_SAMPLE_WINDOW}): {}",
        colorize_percent(summary.avg_recent_memory, thresholds.memory_threshold)
    );
    println!();

    println!("{}", "Recent alerts".bold().underline());
    if report.recent_alerts.is_empty() {
        println!("  {}", "No alerts recorded".green());
    }
    for alert in &report.recent_alerts {
        println!(
            "  {:<20} {} {:.1}%",
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            kind_badge(alert.kind),
            alert.value
        );
    }
    println!();

    println!("{}", "Recent samples".bold().underline());
    println!(
        "  {:<20} {:>8} {:>8}",
        "Time".dimmed(),
        "CPU".dimmed(),
        "Memory".dimmed()
    );
    for sample in &report.recent_samples {
        println!(
            "  {:<20} {:>8} {:>8}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
            colorize_percent(sample.cpu_percent, thresholds.cpu_threshold),
            colorize_percent(sample.memory_percent, thresholds.memory_threshold)
        );
    }
    println!();
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::alert::AlertKind;
    use crate::domain::entities::sample::UtilizationReading;
    use crate::infrastructure::persistence::in_memory_store::InMemoryStore;
    use chrono::Utc;

    fn seed(store: &InMemoryStore) {
        for cpu in [10.0, 95.0, 30.0] {
            let sample = Sample::new(
                UtilizationReading {
                    cpu_percent: cpu,
                    memory_percent: 50.0,
                },
                Utc::now(),
            );
            store.append_sample(&sample).expect("sample");
            if cpu > 80.0 {
                store
                    .append_alert(&Alert::from_sample(AlertKind::Cpu, &sample))
                    .expect("alert");
            }
        }
    }

    #[test]
    fn report_respects_limits() {
        let store = InMemoryStore::new();
        seed(&store);
        let report = build_report(&store, &store, 2, 5).expect("report");
        assert_eq!(report.recent_samples.len(), 2);
        assert_eq!(report.recent_alerts.len(), 1);
        assert_eq!(report.summary.total_alerts, 1);
    }

    #[test]
    fn report_serializes_kinds_lowercase() {
        let store = InMemoryStore::new();
        seed(&store);
        let report = build_report(&store, &store, 10, 10).expect("report");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["summary"]["breakdown"]["cpu"], 1);
        assert_eq!(json["recent_alerts"][0]["kind"], "cpu");
    }

    #[test]
    fn run_report_human_on_empty_store() {
        colored::control::set_override(false);
        let store = InMemoryStore::new();
        assert!(run_report(&store, &store, ThresholdPair::default(), 10, 5, false).is_ok());
    }
}
