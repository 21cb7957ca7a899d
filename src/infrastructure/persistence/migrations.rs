use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist and
/// seeding the global thresholds on first run.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS samples (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            cpu         REAL    NOT NULL,
            memory      REAL    NOT NULL,
            ts          TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            kind        TEXT    NOT NULL,
            value       REAL    NOT NULL,
            ts          TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config (
            key         TEXT    PRIMARY KEY,
            value       TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entity_thresholds (
            entity_id         INTEGER PRIMARY KEY,
            cpu_threshold     REAL    NOT NULL,
            memory_threshold  REAL    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT    PRIMARY KEY,
            entity_id   INTEGER NOT NULL,
            created_at  TEXT    NOT NULL,
            expires_at  TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_samples_ts ON samples(ts);
        CREATE INDEX IF NOT EXISTS idx_alerts_ts ON alerts(ts);
        CREATE INDEX IF NOT EXISTS idx_alerts_kind ON alerts(kind);

        INSERT OR IGNORE INTO config (key, value) VALUES ('cpu_threshold', '80');
        INSERT OR IGNORE INTO config (key, value) VALUES ('memory_threshold', '75');",
    )?;
    Ok(())
}
