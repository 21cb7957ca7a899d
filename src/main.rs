use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use hostwatch::application::config::AppConfig;
use hostwatch::application::services::collector::{Collector, CollectorHandle};
use hostwatch::application::services::dispatcher::NotificationDispatcher;
use hostwatch::application::services::thresholds::ThresholdResolver;
use hostwatch::domain::ports::store::{AlertStore, SampleStore, ThresholdStore};
use hostwatch::domain::value_objects::thresholds::EntityId;
use hostwatch::infrastructure::collectors::sysinfo_collector::SysinfoSampleSource;
use hostwatch::infrastructure::notifications::build_channels;
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;
use hostwatch::presentation::cli::app::{Cli, Commands, ThresholdsAction};
use hostwatch::presentation::cli::commands::daemon::run_daemon;
use hostwatch::presentation::cli::commands::history::run_history;
use hostwatch::presentation::cli::commands::report::run_report;
use hostwatch::presentation::cli::commands::status::run_status;
use hostwatch::presentation::cli::commands::thresholds::{run_set, run_show, ThresholdScope};

fn print_banner(interval: Duration) {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  hostwatch: CPU and memory monitor".bold().cyan());
    println!(
        "{}",
        format!("  sampling every {:.1}s", interval.as_secs_f64()).dimmed()
    );
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = if let Some(ref path) = cli.config {
        AppConfig::load_with_env(path)?
    } else {
        AppConfig::load()?
    };

    // Manual DI: main.rs is the only place that knows concrete types
    let store = Arc::new(SqliteStore::new(&config.database.path)?);
    let resolver = ThresholdResolver::new(Arc::clone(&store) as Arc<dyn ThresholdStore>);
    let source = Arc::new(SysinfoSampleSource::new(config.collector.sample_window()));

    match cli.command {
        Some(Commands::Daemon) | None => {
            let dispatcher = Arc::new(NotificationDispatcher::new(
                build_channels(&config),
                config.notifications.max_in_flight,
            ));
            let interval = config.collector.interval();
            let collector = Collector::new(
                source,
                resolver,
                Arc::clone(&store) as Arc<dyn SampleStore>,
                Arc::clone(&store) as Arc<dyn AlertStore>,
                Arc::clone(&dispatcher),
                interval,
            )
            .with_sample_timeout(config.collector.sample_timeout());
            let handle = CollectorHandle::new(Arc::new(collector));

            print_banner(interval);
            run_daemon(
                &handle,
                &dispatcher,
                config.collector.enabled,
                Duration::from_secs(config.notifications.drain_timeout_secs),
            )
            .await?;
        }
        Some(Commands::Status { json }) => {
            run_status(source.as_ref(), &resolver, json).await?;
        }
        Some(Commands::Thresholds { action }) => match action {
            ThresholdsAction::Show(args) => {
                let scope = match (args.entity, args.token) {
                    (Some(id), _) => ThresholdScope::Entity(EntityId(id)),
                    (None, Some(token)) => ThresholdScope::Session(token),
                    (None, None) => ThresholdScope::Global,
                };
                run_show(&resolver, store.as_ref(), &scope);
            }
            ThresholdsAction::Set(args) => {
                run_set(
                    store.as_ref(),
                    args.cpu,
                    args.memory,
                    args.entity.map(EntityId),
                )?;
            }
        },
        Some(Commands::Report {
            limit,
            alerts,
            json,
        }) => {
            run_report(
                store.as_ref(),
                store.as_ref(),
                resolver.resolve(None),
                limit,
                alerts,
                json,
            )?;
        }
        Some(Commands::History { since, until, json }) => {
            run_history(
                store.as_ref(),
                resolver.resolve(None),
                since,
                until.unwrap_or_else(chrono::Utc::now),
                json,
            )?;
        }
    }

    Ok(())
}
