//! In-memory routine source and completion sink.
//!
//! Useful for embedding the engine without SQLite and for tests. Safe to
//! share between threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::traits::{CompletionSink, RoutineSource};
use crate::error::{SinkError, SourceError};
use crate::routine::Routine;
use crate::session::CompletionRecord;

#[derive(Debug, Default)]
pub struct MemoryStore {
    routines: Mutex<HashMap<String, Routine>>,
    completions: Mutex<Vec<CompletionRecord>>,
    fail_submissions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routine(self, routine: Routine) -> Self {
        self.insert_routine(routine);
        self
    }

    pub fn insert_routine(&self, routine: Routine) {
        lock(&self.routines).insert(routine.id.clone(), routine);
    }

    /// Make every following `submit` fail with `SinkError::Unavailable`.
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// All accepted records, oldest first.
    pub fn completions(&self) -> Vec<CompletionRecord> {
        lock(&self.completions).clone()
    }

    pub fn completions_for(&self, routine_id: &str) -> Vec<CompletionRecord> {
        lock(&self.completions)
            .iter()
            .filter(|r| r.routine_id == routine_id)
            .cloned()
            .collect()
    }
}

impl RoutineSource for MemoryStore {
    fn load_routine(&self, routine_id: &str) -> Result<Routine, SourceError> {
        lock(&self.routines)
            .get(routine_id)
            .cloned()
            .map(Routine::sorted)
            .ok_or_else(|| SourceError::NotFound(routine_id.to_string()))
    }
}

impl CompletionSink for MemoryStore {
    fn submit(&self, record: &CompletionRecord) -> Result<(), SinkError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("memory store set to fail".into()));
        }
        lock(&self.completions).push(record.clone());
        Ok(())
    }
}

// A poisoned lock only means another thread panicked mid-push; the data is
// still a valid Vec/HashMap.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::RoutineStep;

    #[test]
    fn load_returns_steps_in_order() {
        let store = MemoryStore::new().with_routine(Routine::new(
            "morning",
            "Morning",
            vec![
                RoutineStep::new("b", 2, "Breakfast", 600),
                RoutineStep::new("a", 1, "Wake up", 60),
            ],
        ));
        let routine = store.load_routine("morning").unwrap();
        assert_eq!(routine.steps[0].id, "a");
    }

    #[test]
    fn missing_routine_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_routine("nope"),
            Err(SourceError::NotFound(id)) if id == "nope"
        ));
    }
}
