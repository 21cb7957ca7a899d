use colored::Colorize;
use serde::Serialize;

use crate::application::services::thresholds::ThresholdResolver;
use crate::domain::ports::session::SessionResolver;
use crate::domain::ports::store::ThresholdStore;
use crate::domain::value_objects::thresholds::{EntityId, ThresholdPair};

/// Which thresholds a `show` should resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdScope {
    Global,
    Entity(EntityId),
    Session(String),
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    scope: String,
    cpu_threshold: f64,
    memory_threshold: f64,
}

fn resolve_scope(
    resolver: &ThresholdResolver,
    sessions: &dyn SessionResolver,
    scope: &ThresholdScope,
) -> ShowOutput {
    let (label, pair) = match scope {
        ThresholdScope::Global => ("global".to_string(), resolver.resolve(None)),
        ThresholdScope::Entity(id) => (format!("entity {id}"), resolver.resolve(Some(*id))),
        ThresholdScope::Session(token) => (
            "session".to_string(),
            resolver.resolve_for_session(sessions, token),
        ),
    };
    ShowOutput {
        scope: label,
        cpu_threshold: pair.cpu_threshold,
        memory_threshold: pair.memory_threshold,
    }
}

/// Print the effective thresholds for `scope`.
pub fn run_show(resolver: &ThresholdResolver, sessions: &dyn SessionResolver, scope: &ThresholdScope) {
    let out = resolve_scope(resolver, sessions, scope);
    println!("{} ({})", "Thresholds".bold().cyan(), out.scope);
    println!("  CPU:    {:.1}%", out.cpu_threshold);
    println!("  Memory: {:.1}%", out.memory_threshold);
}

/// Validate and store a threshold pair, globally or for one entity.
///
/// # Errors
///
/// Returns an error if a value is not a finite percentage or the write fails.
pub fn run_set(
    store: &dyn ThresholdStore,
    cpu: f64,
    memory: f64,
    entity: Option<EntityId>,
) -> anyhow::Result<ThresholdPair> {
    let pair = ThresholdPair::validated(cpu, memory)?;
    match entity {
        Some(id) => store.set_entity_thresholds(id, &pair)?,
        None => store.set_global_thresholds(&pair)?,
    }
    tracing::info!(
        entity = ?entity.map(|e| e.0),
        cpu = pair.cpu_threshold,
        memory = pair.memory_threshold,
        "Thresholds updated"
    );
    println!(
        "{} cpu={:.1}% memory={:.1}%",
        "Thresholds saved:".green().bold(),
        pair.cpu_threshold,
        pair.memory_threshold
    );
    Ok(pair)
}
