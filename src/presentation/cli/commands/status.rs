use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::application::services::thresholds::ThresholdResolver;
use crate::domain::entities::alert::AlertKind;
use crate::domain::entities::sample::Sample;
use crate::domain::ports::sample_source::SampleSource;
use crate::domain::rules;
use crate::domain::value_objects::thresholds::ThresholdPair;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_percent, kind_badge, print_section_header, usage_bar,
};

#[derive(Debug, Serialize)]
struct StatusOutput {
    timestamp: DateTime<Utc>,
    cpu_percent: f64,
    memory_percent: f64,
    thresholds: ThresholdPair,
    would_fire: Vec<AlertKind>,
}

async fn collect_status(
    source: &dyn SampleSource,
    resolver: &ThresholdResolver,
) -> anyhow::Result<StatusOutput> {
    let reading = source
        .sample()
        .await
        .context("Failed to sample host utilization")?;
    let sample = Sample::new(reading, Utc::now());
    let thresholds = resolver.resolve(None);

    Ok(StatusOutput {
        timestamp: sample.timestamp,
        cpu_percent: sample.cpu_percent,
        memory_percent: sample.memory_percent,
        thresholds,
        would_fire: rules::evaluate(&sample, &thresholds),
    })
}

/// Take one reading and show it against the global thresholds. Nothing is
/// persisted and no notification is sent.
///
/// # Errors
///
/// Returns an error if sampling or JSON serialization fails.
pub async fn run_status(
    source: &dyn SampleSource,
    resolver: &ThresholdResolver,
    json: bool,
) -> anyhow::Result<()> {
    let status = collect_status(source, resolver).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "hostwatch: host status".bold().cyan());
    println!("{}", "━".repeat(50));

    let t = &status.thresholds;
    print_section_header("\nCPU");
    println!(
        "  {} {}  (threshold {:.1}%)",
        usage_bar(status.cpu_percent, t.cpu_threshold, 30),
        colorize_percent(status.cpu_percent, t.cpu_threshold),
        t.cpu_threshold
    );

    print_section_header("\nMemory");
    println!(
        "  {} {}  (threshold {:.1}%)",
        usage_bar(status.memory_percent, t.memory_threshold, 30),
        colorize_percent(status.memory_percent, t.memory_threshold),
        t.memory_threshold
    );

    println!();
    if status.would_fire.is_empty() {
        println!("{}", "No threshold exceeded".green().bold());
    } else {
        for kind in &status.would_fire {
            println!("{} {}", kind_badge(*kind), "threshold exceeded".red().bold());
        }
    }

    Ok(())
}
