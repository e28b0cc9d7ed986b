//! Database schema migrations for routinely.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(from = current_version, to = SCHEMA_VERSION, "database schema migrated");
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0)) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Migration v1: routines, their steps, the completion history and the kv store.
///
/// `completions.session_id` is unique so a resubmitted record never adds a
/// second history row for the same session.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS routines (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS routine_steps (
            routine_id  TEXT NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
            id          TEXT NOT NULL,
            step_order  INTEGER NOT NULL,
            label       TEXT NOT NULL DEFAULT '',
            icon        TEXT NOT NULL DEFAULT '',
            target_duration_secs INTEGER NOT NULL,
            PRIMARY KEY (routine_id, id)
        );

        CREATE TABLE IF NOT EXISTS completions (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            routine_id          TEXT NOT NULL,
            session_id          TEXT NOT NULL UNIQUE,
            steps_completed     INTEGER NOT NULL,
            total_budgeted_secs INTEGER NOT NULL,
            mood_before         TEXT,
            mood_after          TEXT,
            completed_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_routine_steps_order ON routine_steps(routine_id, step_order);
        CREATE INDEX IF NOT EXISTS idx_completions_routine ON completions(routine_id, completed_at);",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;

    tx.commit()?;
    Ok(())
}
