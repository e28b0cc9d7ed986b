//! SQLite-based routine storage and completion history.
//!
//! Provides persistent storage for:
//! - Routine definitions (read by sessions through [`RoutineSource`])
//! - Completion records, append-only (written through [`CompletionSink`])
//! - Key-value store for application state (the CLI keeps its in-progress
//!   session here)

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use super::migrations;
use super::traits::{CompletionSink, RoutineSource};
use crate::error::{CoreError, DatabaseError, SinkError, SourceError};
use crate::routine::{MoodSignal, Routine, RoutineStep};
use crate::session::CompletionRecord;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One line of `routine list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSummary {
    pub id: String,
    pub name: String,
    pub step_count: usize,
    pub total_budgeted_secs: u64,
}

/// SQLite database for routines and completions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/routinely.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("routinely.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        // Several CLI processes may share the file while `session watch` runs.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Routines ─────────────────────────────────────────────────────

    /// Insert or replace a routine together with all of its steps.
    pub fn save_routine(&self, routine: &Routine) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO routines (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![routine.id, routine.name],
        )?;
        tx.execute("DELETE FROM routine_steps WHERE routine_id = ?1", params![routine.id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO routine_steps (routine_id, id, step_order, label, icon, target_duration_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for step in &routine.steps {
                stmt.execute(params![
                    routine.id,
                    step.id,
                    step.order,
                    step.label,
                    step.icon,
                    step.target_duration_secs,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(routine_id = %routine.id, steps = routine.steps.len(), "routine saved");
        Ok(())
    }

    pub fn list_routines(&self) -> Result<Vec<RoutineSummary>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, COUNT(s.id), COALESCE(SUM(s.target_duration_secs), 0)
             FROM routines r
             LEFT JOIN routine_steps s ON s.routine_id = r.id
             GROUP BY r.id, r.name
             ORDER BY r.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RoutineSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                step_count: row.get(2)?,
                total_budgeted_secs: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_routine(&self, routine_id: &str) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM routine_steps WHERE routine_id = ?1", params![routine_id])?;
        let removed = tx.execute("DELETE FROM routines WHERE id = ?1", params![routine_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ── Completions ──────────────────────────────────────────────────

    /// Completion history, newest first.
    pub fn completions(
        &self,
        routine_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CompletionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT routine_id, session_id, steps_completed, total_budgeted_secs,
                    mood_before, mood_after, completed_at
             FROM completions
             WHERE ?1 IS NULL OR routine_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![routine_id, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, usize>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (routine_id, session_id, steps_completed, total_budgeted_secs, before, after, at) = row?;
            records.push(CompletionRecord {
                routine_id,
                session_id: Uuid::parse_str(&session_id)
                    .map_err(|e| DatabaseError::QueryFailed(format!("bad session id '{session_id}': {e}")))?,
                steps_completed,
                total_budgeted_secs,
                mood_before: parse_mood(before)?,
                mood_after: parse_mood(after)?,
                completed_at: DateTime::parse_from_rfc3339(&at)
                    .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{at}': {e}")))?
                    .with_timezone(&Utc),
            });
        }
        Ok(records)
    }

    // ── Key-value store ──────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Replace `key`'s value only if it still equals `expected`.
    ///
    /// Returns `false` when another writer changed or removed the value.
    pub fn kv_replace(&self, key: &str, expected: &str, value: &str) -> Result<bool, DatabaseError> {
        let updated = self.conn.execute(
            "UPDATE kv SET value = ?3 WHERE key = ?1 AND value = ?2",
            params![key, expected, value],
        )?;
        Ok(updated == 1)
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

impl RoutineSource for Database {
    fn load_routine(&self, routine_id: &str) -> Result<Routine, SourceError> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM routines WHERE id = ?1",
                params![routine_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or_else(|| SourceError::NotFound(routine_id.to_string()))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, step_order, label, icon, target_duration_secs
             FROM routine_steps
             WHERE routine_id = ?1
             ORDER BY step_order",
        )?;
        let steps = stmt
            .query_map(params![routine_id], |row| {
                Ok(RoutineStep {
                    id: row.get(0)?,
                    order: row.get(1)?,
                    label: row.get(2)?,
                    icon: row.get(3)?,
                    target_duration_secs: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Routine::new(routine_id, name, steps))
    }
}

impl CompletionSink for Database {
    fn submit(&self, record: &CompletionRecord) -> Result<(), SinkError> {
        self.conn.execute(
            "INSERT INTO completions
                (routine_id, session_id, steps_completed, total_budgeted_secs,
                 mood_before, mood_after, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(session_id) DO NOTHING",
            params![
                record.routine_id,
                record.session_id.to_string(),
                record.steps_completed,
                record.total_budgeted_secs,
                record.mood_before.map(|m| m.as_str()),
                record.mood_after.map(|m| m.as_str()),
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn parse_mood(value: Option<String>) -> Result<Option<MoodSignal>, DatabaseError> {
    value
        .map(|v| v.parse::<MoodSignal>())
        .transpose()
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bedtime() -> Routine {
        Routine::new(
            "bedtime",
            "Bedtime",
            vec![
                RoutineStep::new("teeth", 2, "Brush teeth", 120).with_icon("toothbrush"),
                RoutineStep::new("bath", 1, "Bath", 600),
            ],
        )
    }

    fn record(routine_id: &str, mood_before: Option<MoodSignal>) -> CompletionRecord {
        CompletionRecord {
            routine_id: routine_id.into(),
            session_id: Uuid::new_v4(),
            steps_completed: 2,
            total_budgeted_secs: 720,
            mood_before,
            mood_after: None,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_routine_orders_steps() {
        let db = Database::open_memory().unwrap();
        db.save_routine(&bedtime()).unwrap();
        let routine = db.load_routine("bedtime").unwrap();
        assert_eq!(routine.name, "Bedtime");
        let ids: Vec<_> = routine.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["bath", "teeth"]);
        assert_eq!(routine.steps[1].icon, "toothbrush");
    }

    #[test]
    fn resaving_replaces_steps() {
        let db = Database::open_memory().unwrap();
        db.save_routine(&bedtime()).unwrap();
        let shorter = Routine::new("bedtime", "Bedtime", vec![RoutineStep::new("pj", 1, "Pyjamas", 60)]);
        db.save_routine(&shorter).unwrap();
        assert_eq!(db.load_routine("bedtime").unwrap().steps.len(), 1);
    }

    #[test]
    fn unknown_routine_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(db.load_routine("nope"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn list_routines_summarises_budget() {
        let db = Database::open_memory().unwrap();
        db.save_routine(&bedtime()).unwrap();
        db.save_routine(&Routine::new("empty", "", Vec::new())).unwrap();
        let list = db.list_routines().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "bedtime");
        assert_eq!(list[0].step_count, 2);
        assert_eq!(list[0].total_budgeted_secs, 720);
        assert_eq!(list[1].step_count, 0);
    }

    #[test]
    fn completions_are_appended_and_moods_roundtrip() {
        let db = Database::open_memory().unwrap();
        let first = record("bedtime", Some(MoodSignal::Sad));
        let second = record("bedtime", None);
        db.submit(&first).unwrap();
        db.submit(&second).unwrap();
        db.submit(&record("morning", None)).unwrap();

        let history = db.completions(Some("bedtime"), 10).unwrap();
        assert_eq!(history.len(), 2);
        let stored_first = history.iter().find(|r| r.session_id == first.session_id).unwrap();
        assert_eq!(stored_first.mood_before, Some(MoodSignal::Sad));
        assert_eq!(stored_first.mood_after, None);

        assert_eq!(db.completions(None, 10).unwrap().len(), 3);
        assert_eq!(db.completions(None, 1).unwrap().len(), 1);
    }

    #[test]
    fn resubmitting_same_session_keeps_one_row() {
        let db = Database::open_memory().unwrap();
        let rec = record("bedtime", None);
        db.submit(&rec).unwrap();
        db.submit(&rec).unwrap();
        assert_eq!(db.completions(None, 10).unwrap().len(), 1);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        assert!(db.kv_delete("test").unwrap());
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn kv_replace_only_overwrites_expected_value() {
        let db = Database::open_memory().unwrap();
        assert!(!db.kv_replace("session", "a", "b").unwrap());
        db.kv_set("session", "a").unwrap();
        assert!(db.kv_replace("session", "a", "b").unwrap());
        assert!(!db.kv_replace("session", "a", "c").unwrap());
        assert_eq!(db.kv_get("session").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routinely.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.save_routine(&bedtime()).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.load_routine("bedtime").unwrap().steps.len(), 2);
    }
}
