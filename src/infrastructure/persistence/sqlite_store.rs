use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::domain::entities::alert::{Alert, AlertKind};
use crate::domain::entities::sample::Sample;
use crate::domain::ports::session::SessionResolver;
use crate::domain::ports::store::{AlertStore, SampleStore, StoreError, ThresholdStore};
use crate::domain::value_objects::thresholds::{EntityId, ThresholdPair};

use super::migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed persistent store.
///
/// Writers share one connection behind a mutex. Every read opens its own
/// read-only connection, so in WAL mode reads never wait on the write lock.
pub struct SqliteStore {
    path: PathBuf,
    writer: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    ///
    /// Expands `~`, creates parent directories, sets WAL mode and pragmas,
    /// and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        let conn = Connection::open(&db_path).map_err(write_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(write_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(write_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(write_err)?;

        migrations::initialize_schema(&conn).map_err(write_err)?;

        tracing::debug!(path = %db_path.display(), "SQLite store ready");
        Ok(Self {
            path: db_path,
            writer: Mutex::new(conn),
        })
    }

    fn reader(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(read_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(read_err)?;
        Ok(conn)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let conn = self
            .writer
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let result = f(&conn).map_err(write_err);
        drop(conn);
        result
    }

    /// Register a session token for `entity`. Used by the identity layer and
    /// by tests; nothing in this crate issues tokens.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the insert fails.
    pub fn insert_session(
        &self,
        token: &str,
        entity: EntityId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sessions (token, entity_id, created_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, entity.0, format_ts(Utc::now()), format_ts(expires_at)],
            )
        })?;
        Ok(())
    }
}

fn write_err(e: rusqlite::Error) -> StoreError {
    StoreError::WriteFailed(e.to_string())
}

fn read_err(e: rusqlite::Error) -> StoreError {
    StoreError::ReadFailed(e.to_string())
}

/// Fixed-width UTC timestamps so lexical order matches chronological order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_sample_row(row: &rusqlite::Row<'_>) -> Result<Sample, rusqlite::Error> {
    let ts: String = row.get(2)?;
    Ok(Sample {
        cpu_percent: row.get(0)?,
        memory_percent: row.get(1)?,
        timestamp: parse_ts(&ts, 2)?,
    })
}

fn parse_kind(raw: &str, column: usize) -> Result<AlertKind, rusqlite::Error> {
    raw.parse::<AlertKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })
}

fn parse_alert_row(row: &rusqlite::Row<'_>) -> Result<Alert, rusqlite::Error> {
    let kind: String = row.get(0)?;
    let ts: String = row.get(2)?;
    Ok(Alert {
        kind: parse_kind(&kind, 0)?,
        value: row.get(1)?,
        timestamp: parse_ts(&ts, 2)?,
    })
}

fn read_threshold(conn: &Connection, key: &str, fallback: f64) -> Result<f64, StoreError> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM config WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(read_err)?;

    match raw {
        None => Ok(fallback),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| StoreError::ReadFailed(format!("config {key}={raw:?}: {e}"))),
    }
}

impl SampleStore for SqliteStore {
    fn append_sample(&self, sample: &Sample) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO samples (cpu, memory, ts) VALUES (?1, ?2, ?3)",
                params![
                    sample.cpu_percent,
                    sample.memory_percent,
                    format_ts(sample.timestamp)
                ],
            )
        })?;
        Ok(())
    }

    fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, StoreError> {
        let limit = i64::try_from(limit).map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        let conn = self.reader()?;
        let mut stmt = conn
            .prepare(
                "SELECT cpu, memory, ts FROM samples \
                 ORDER BY ts DESC, id DESC LIMIT ?1",
            )
            .map_err(read_err)?;
        let samples = stmt
            .query_map(params![limit], parse_sample_row)
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        Ok(samples)
    }

    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn
            .prepare(
                "SELECT cpu, memory, ts FROM samples \
                 WHERE ts >= ?1 AND ts <= ?2 ORDER BY ts ASC, id ASC",
            )
            .map_err(read_err)?;
        let samples = stmt
            .query_map(params![format_ts(start), format_ts(end)], parse_sample_row)
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        Ok(samples)
    }
}

impl AlertStore for SqliteStore {
    fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO alerts (kind, value, ts) VALUES (?1, ?2, ?3)",
                params![alert.kind.as_str(), alert.value, format_ts(alert.timestamp)],
            )
        })?;
        Ok(())
    }

    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        let limit = i64::try_from(limit).map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        let conn = self.reader()?;
        let mut stmt = conn
            .prepare(
                "SELECT kind, value, ts FROM alerts \
                 ORDER BY ts DESC, id DESC LIMIT ?1",
            )
            .map_err(read_err)?;
        let alerts = stmt
            .query_map(params![limit], parse_alert_row)
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        Ok(alerts)
    }

    fn alert_counts(&self) -> Result<BTreeMap<AlertKind, u64>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM alerts GROUP BY kind")
            .map_err(read_err)?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((parse_kind(&kind, 0)?, count))
            })
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        let mut counts = BTreeMap::new();
        for (kind, count) in rows {
            let count = u64::try_from(count).map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }
}

impl ThresholdStore for SqliteStore {
    fn global_thresholds(&self) -> Result<ThresholdPair, StoreError> {
        let defaults = ThresholdPair::default();
        let conn = self.reader()?;
        Ok(ThresholdPair::new(
            read_threshold(&conn, "cpu_threshold", defaults.cpu_threshold)?,
            read_threshold(&conn, "memory_threshold", defaults.memory_threshold)?,
        ))
    }

    fn entity_thresholds(&self, entity: EntityId) -> Result<Option<ThresholdPair>, StoreError> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT cpu_threshold, memory_threshold FROM entity_thresholds WHERE entity_id = ?1",
            params![entity.0],
            |row| Ok(ThresholdPair::new(row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(read_err)
    }

    fn set_global_thresholds(&self, pair: &ThresholdPair) -> Result<(), StoreError> {
        self.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO config (key, value) VALUES ('cpu_threshold', ?1)",
                params![pair.cpu_threshold.to_string()],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO config (key, value) VALUES ('memory_threshold', ?1)",
                params![pair.memory_threshold.to_string()],
            )?;
            tx.commit()
        })
    }

    fn set_entity_thresholds(
        &self,
        entity: EntityId,
        pair: &ThresholdPair,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO entity_thresholds (entity_id, cpu_threshold, memory_threshold) \
                 VALUES (?1, ?2, ?3) \
                 ON CONFLICT(entity_id) DO UPDATE SET \
                 cpu_threshold = excluded.cpu_threshold, \
                 memory_threshold = excluded.memory_threshold",
                params![entity.0, pair.cpu_threshold, pair.memory_threshold],
            )
        })?;
        Ok(())
    }
}

impl SessionResolver for SqliteStore {
    fn entity_for_token(&self, token: &str) -> Result<Option<EntityId>, StoreError> {
        let conn = self.reader()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT entity_id, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(read_err)?;

        let Some((entity_id, expires_at)) = row else {
            return Ok(None);
        };
        let expires_at = parse_ts(&expires_at, 1).map_err(read_err)?;
        Ok((expires_at > Utc::now()).then_some(EntityId(entity_id)))
    }
}
