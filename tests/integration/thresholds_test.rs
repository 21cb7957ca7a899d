#![allow(clippy::expect_used)]

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use hostwatch::application::services::thresholds::ThresholdResolver;
use hostwatch::domain::ports::store::ThresholdStore;
use hostwatch::domain::value_objects::thresholds::{EntityId, ThresholdPair};
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;
use hostwatch::presentation::cli::commands::thresholds::run_set;

fn open(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let path = dir.path().join("thresholds.db");
    Arc::new(SqliteStore::new(path.to_str().expect("utf8")).expect("open"))
}

fn resolver(store: &Arc<SqliteStore>) -> ThresholdResolver {
    ThresholdResolver::new(Arc::clone(store) as Arc<dyn ThresholdStore>)
}

#[test]
fn fresh_database_resolves_seeded_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let resolver = resolver(&store);

    assert_eq!(resolver.resolve(None), ThresholdPair::new(80.0, 75.0));
    assert_eq!(resolver.resolve(Some(EntityId(1))), ThresholdPair::new(80.0, 75.0));
}

#[test]
fn override_wins_only_for_its_entity_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let store = open(&dir);
        run_set(store.as_ref(), 60.0, 50.0, None).expect("global");
        run_set(store.as_ref(), 95.0, 90.0, Some(EntityId(7))).expect("override");
    }

    let store = open(&dir);
    let resolver = resolver(&store);
    assert_eq!(resolver.resolve(Some(EntityId(7))), ThresholdPair::new(95.0, 90.0));
    assert_eq!(resolver.resolve(Some(EntityId(8))), ThresholdPair::new(60.0, 50.0));
    assert_eq!(resolver.resolve(None), ThresholdPair::new(60.0, 50.0));
}

#[test]
fn session_tokens_resolve_until_they_expire() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let resolver = resolver(&store);
    run_set(store.as_ref(), 40.0, 45.0, Some(EntityId(3))).expect("override");

    store
        .insert_session("live", EntityId(3), Utc::now() + TimeDelta::hours(1))
        .expect("live session");
    store
        .insert_session("stale", EntityId(3), Utc::now() - TimeDelta::minutes(1))
        .expect("stale session");

    assert_eq!(
        resolver.resolve_for_session(store.as_ref(), "live"),
        ThresholdPair::new(40.0, 45.0)
    );
    assert_eq!(
        resolver.resolve_for_session(store.as_ref(), "stale"),
        ThresholdPair::default()
    );
    assert_eq!(
        resolver.resolve_for_session(store.as_ref(), "unknown"),
        ThresholdPair::default()
    );
}

#[test]
fn rejected_update_leaves_stored_pair_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    run_set(store.as_ref(), 70.0, 70.0, None).expect("valid");

    assert!(run_set(store.as_ref(), -1.0, 70.0, None).is_err());
    assert!(run_set(store.as_ref(), 70.0, f64::INFINITY, None).is_err());
    assert_eq!(
        store.global_thresholds().expect("read"),
        ThresholdPair::new(70.0, 70.0)
    );
}
