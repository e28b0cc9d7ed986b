use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routine::MoodSignal;
use crate::session::CompletionRecord;

/// Which end of the session a mood signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodSlot {
    Before,
    After,
}

/// Every state change of a session produces an Event.
/// Callers render from these; a `None` in their place means the call was a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        routine_id: String,
        step_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        step_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        step_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StepAdvanced {
        from_step: usize,
        to_step: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StepRetreated {
        from_step: usize,
        to_step: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The current step's budget ran out. The step is not finished until
    /// the caller advances.
    TimeUp {
        step_index: usize,
        step_id: String,
        at: DateTime<Utc>,
    },
    MoodCaptured {
        slot: MoodSlot,
        mood: MoodSignal,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        record: CompletionRecord,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session_id: Uuid,
        routine_id: String,
        step_index: usize,
        step_count: usize,
        step_id: Option<String>,
        step_label: String,
        step_icon: String,
        remaining_secs: u64,
        target_secs: u64,
        is_running: bool,
        is_complete: bool,
        is_time_up: bool,
        progress_pct: f64,
        mood_before: Option<MoodSignal>,
        mood_after: Option<MoodSignal>,
        at: DateTime<Utc>,
    },
}
