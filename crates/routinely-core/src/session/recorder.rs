//! Completion recording.
//!
//! The recorder builds a [`CompletionRecord`] at most once per session and
//! hands it to a [`CompletionSink`]. A failed submission leaves the record in
//! place so the caller can retry; it never undoes completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::routine::MoodSignal;
use crate::storage::CompletionSink;

/// Summary of one fully traversed session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub routine_id: String,
    pub session_id: Uuid,
    pub steps_completed: usize,
    /// Sum of the steps' budgeted durations, not time actually spent.
    pub total_budgeted_secs: u64,
    pub mood_before: Option<MoodSignal>,
    pub mood_after: Option<MoodSignal>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecorder {
    record: Option<CompletionRecord>,
    #[serde(default)]
    persisted: bool,
}

impl CompletionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self) -> bool {
        self.record.is_some()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn record(&self) -> Option<&CompletionRecord> {
        self.record.as_ref()
    }

    /// Build the record with `build` unless it was already built.
    ///
    /// Returns the new record only on the first call.
    pub fn fire(&mut self, build: impl FnOnce() -> CompletionRecord) -> Option<&CompletionRecord> {
        if self.record.is_some() {
            return None;
        }
        self.record = Some(build());
        self.record.as_ref()
    }

    /// Submit the built record. A no-op when nothing was fired or the
    /// record is already stored.
    pub fn submit<S>(&mut self, sink: &S) -> Result<bool, SessionError>
    where
        S: CompletionSink + ?Sized,
    {
        let Some(record) = self.record.as_ref() else {
            return Ok(false);
        };
        if self.persisted {
            return Ok(false);
        }
        match sink.submit(record) {
            Ok(()) => {
                self.persisted = true;
                tracing::info!(
                    routine_id = %record.routine_id,
                    session_id = %record.session_id,
                    "completion persisted"
                );
                Ok(true)
            }
            Err(source) => {
                tracing::warn!(
                    routine_id = %record.routine_id,
                    session_id = %record.session_id,
                    error = %source,
                    "completion could not be persisted"
                );
                Err(SessionError::CompletionPersistFailed {
                    routine_id: record.routine_id.clone(),
                    record: Box::new(record.clone()),
                    source,
                })
            }
        }
    }
}
