use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::domain::entities::sample::Sample;
use crate::domain::ports::store::SampleStore;
use crate::domain::value_objects::thresholds::ThresholdPair;
use crate::presentation::cli::formatters::status_fmt::{colorize_percent, print_section_header};

fn load_history(
    samples: &dyn SampleStore,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<Vec<Sample>> {
    if since > until {
        anyhow::bail!("invalid time range: {since} is after {until}");
    }
    samples
        .samples_between(since, until)
        .map_err(|e| anyhow::anyhow!("failed to read samples: {e}"))
}

/// Print every sample recorded between `since` and `until` (inclusive),
/// oldest first.
///
/// # Errors
///
/// Returns an error if the range is inverted, the store read fails, or
/// JSON serialization fails.
pub fn run_history(
    samples: &dyn SampleStore,
    thresholds: ThresholdPair,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let history = load_history(samples, since, until)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    print_section_header("Sample history");
    println!(
        "  {} → {}",
        since.format("%Y-%m-%d %H:%M:%S"),
        until.format("%Y-%m-%d %H:%M:%S")
    );
    if history.is_empty() {
        println!("  {}", "No samples in range".dimmed());
        return Ok(());
    }
    for sample in &history {
        println!(
            "  {:<20} {:>8} {:>8}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
            colorize_percent(sample.cpu_percent, thresholds.cpu_threshold),
            colorize_percent(sample.memory_percent, thresholds.memory_threshold)
        );
    }
    println!("  {} sample(s)", history.len().to_string().bold());
    Ok(())
}
