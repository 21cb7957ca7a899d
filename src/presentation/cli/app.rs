use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hostwatch: host CPU and memory monitor
///
/// Samples utilization on a fixed interval, records threshold breaches and
/// notifies configured channels (webhook, email, log file).
#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `daemon`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the collector until interrupted
    #[command(alias = "d")]
    Daemon,

    /// Take one reading and show which alerts it would raise
    #[command(alias = "s")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change alert thresholds
    #[command(alias = "t")]
    Thresholds {
        #[command(subcommand)]
        action: ThresholdsAction,
    },

    /// Summarize recorded alerts and recent samples
    #[command(alias = "r")]
    Report {
        /// Number of recent samples to list
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Number of recent alerts to list
        #[arg(long, default_value = "5")]
        alerts: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List samples recorded in a time range
    History {
        /// Range start, RFC 3339 (e.g. 2026-01-01T00:00:00Z)
        #[arg(long, value_parser = parse_timestamp)]
        since: DateTime<Utc>,

        /// Range end, RFC 3339 (defaults to now)
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<DateTime<Utc>>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum ThresholdsAction {
    /// Print the effective thresholds
    Show(ShowArgs),

    /// Replace the global thresholds or one entity's override
    Set(SetArgs),
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct ShowArgs {
    /// Entity whose override to resolve
    #[arg(long)]
    pub entity: Option<i64>,

    /// Session token whose entity to resolve
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// CPU threshold, percent
    #[arg(long)]
    pub cpu: f64,

    /// Memory threshold, percent
    #[arg(long)]
    pub memory: f64,

    /// Store as an override for this entity instead of globally
    #[arg(long)]
    pub entity: Option<i64>,
}
