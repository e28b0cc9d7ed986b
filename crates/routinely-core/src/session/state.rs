//! Routine session state machine.
//!
//! A session walks one routine from its first step to completion. It owns no
//! clock and no thread: the caller delivers wake-ups with `tick()` (or
//! `tick_elapsed()` for late ones) and navigates with `advance()`/`retreat()`.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Running <-> Paused
//!            |  advance/retreat: stay in Running/Paused, new step
//!            v  advance on last step
//!          Complete (terminal, timer stopped, record fired once)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = RoutineSession::from_routine(routine)?;
//! session.start();
//! // once per second:
//! session.tick();
//! // when the user is ready:
//! session.advance(&sink)?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::countdown::{Countdown, TickOutcome, TickPolicy};
use super::recorder::{CompletionRecord, CompletionRecorder};
use super::sequencer::{Move, StepSequencer};
use crate::error::SessionError;
use crate::events::{Event, MoodSlot};
use crate::routine::{total_budgeted_secs, MoodSignal, Routine, RoutineStep};
use crate::storage::CompletionSink;

/// One playback attempt of one routine.
///
/// This is the single source of truth for everything a caller observes:
/// position, countdown, running flag, captured moods and the completion
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineSession {
    id: Uuid,
    routine_id: String,
    steps: Vec<RoutineStep>,
    sequencer: StepSequencer,
    countdown: Countdown,
    #[serde(default)]
    tick_policy: TickPolicy,
    mood_before: Option<MoodSignal>,
    mood_after: Option<MoodSignal>,
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    recorder: CompletionRecorder,
}

impl RoutineSession {
    /// Build a session over an already-ordered step list.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidRoutine` if `steps` is empty.
    pub fn new(routine_id: impl Into<String>, steps: Vec<RoutineStep>) -> Result<Self, SessionError> {
        let routine_id = routine_id.into();
        let Some(sequencer) = StepSequencer::new(steps.len()) else {
            return Err(SessionError::InvalidRoutine { routine_id });
        };
        let countdown = Countdown::new(steps[0].target_duration_secs);
        Ok(Self {
            id: Uuid::new_v4(),
            routine_id,
            steps,
            sequencer,
            countdown,
            tick_policy: TickPolicy::default(),
            mood_before: None,
            mood_after: None,
            started_at: None,
            recorder: CompletionRecorder::new(),
        })
    }

    pub fn from_routine(routine: Routine) -> Result<Self, SessionError> {
        Self::new(routine.id, routine.steps)
    }

    pub fn with_tick_policy(mut self, policy: TickPolicy) -> Self {
        self.tick_policy = policy;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn routine_id(&self) -> &str {
        &self.routine_id
    }

    pub fn steps(&self) -> &[RoutineStep] {
        &self.steps
    }

    /// In `0..=steps().len()`; equal to the length once complete.
    pub fn current_index(&self) -> usize {
        self.sequencer.current()
    }

    pub fn current_step(&self) -> Option<&RoutineStep> {
        self.steps.get(self.sequencer.current())
    }

    /// Meaningful only while not complete.
    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_complete(&self) -> bool {
        self.sequencer.is_complete()
    }

    /// The current step's budget has run out. Never true once complete.
    pub fn is_time_up(&self) -> bool {
        !self.is_complete() && self.countdown.is_time_up()
    }

    pub fn tick_policy(&self) -> TickPolicy {
        self.tick_policy
    }

    pub fn mood_before(&self) -> Option<MoodSignal> {
        self.mood_before
    }

    pub fn mood_after(&self) -> Option<MoodSignal> {
        self.mood_after
    }

    pub fn total_budgeted_secs(&self) -> u64 {
        total_budgeted_secs(&self.steps)
    }

    /// The record built on completion, kept for retries.
    pub fn completion_record(&self) -> Option<&CompletionRecord> {
        self.recorder.record()
    }

    pub fn is_persisted(&self) -> bool {
        self.recorder.is_persisted()
    }

    /// 0.0 .. 100.0 progress across the routine's budget.
    pub fn progress_pct(&self) -> f64 {
        if self.is_complete() {
            return 100.0;
        }
        let index = self.sequencer.current();
        let total = self.total_budgeted_secs();
        if total == 0 {
            return index as f64 / self.steps.len() as f64 * 100.0;
        }
        let done = total_budgeted_secs(&self.steps[..index]) as f64;
        let current = self.countdown.elapsed_secs() as f64;
        ((done + current) / total as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let step = self.current_step();
        Event::StateSnapshot {
            session_id: self.id,
            routine_id: self.routine_id.clone(),
            step_index: self.sequencer.current(),
            step_count: self.steps.len(),
            step_id: step.map(|s| s.id.clone()),
            step_label: step.map(|s| s.label.clone()).unwrap_or_default(),
            step_icon: step.map(|s| s.icon.clone()).unwrap_or_default(),
            remaining_secs: self.remaining_secs(),
            target_secs: self.countdown.target_secs(),
            is_running: self.is_running(),
            is_complete: self.is_complete(),
            is_time_up: self.is_time_up(),
            progress_pct: self.progress_pct(),
            mood_before: self.mood_before,
            mood_after: self.mood_after,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the countdown. The first start loads the current step's
    /// budget; later calls behave like `resume`.
    pub fn start(&mut self) -> Option<Event> {
        if self.is_complete() {
            return None;
        }
        if self.started_at.is_some() {
            return self.resume();
        }
        self.started_at = Some(Utc::now());
        self.reset_countdown();
        self.countdown.resume();
        tracing::info!(
            session_id = %self.id,
            routine_id = %self.routine_id,
            steps = self.steps.len(),
            "session started"
        );
        Some(Event::SessionStarted {
            session_id: self.id,
            routine_id: self.routine_id.clone(),
            step_index: self.sequencer.current(),
            remaining_secs: self.remaining_secs(),
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.is_complete() || !self.countdown.pause() {
            return None;
        }
        tracing::debug!(session_id = %self.id, remaining_secs = self.remaining_secs(), "paused");
        Some(Event::SessionPaused {
            step_index: self.sequencer.current(),
            remaining_secs: self.remaining_secs(),
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.is_complete() {
            return None;
        }
        if self.started_at.is_none() {
            return self.start();
        }
        if !self.countdown.resume() {
            return None;
        }
        tracing::debug!(session_id = %self.id, remaining_secs = self.remaining_secs(), "resumed");
        Some(Event::SessionResumed {
            step_index: self.sequencer.current(),
            remaining_secs: self.remaining_secs(),
            at: Utc::now(),
        })
    }

    /// Deliver one second of elapsed time.
    ///
    /// Returns `Some(Event::TimeUp)` on the wake-up that exhausts the
    /// current step's budget. The step is not left until `advance()`.
    pub fn tick(&mut self) -> Option<Event> {
        let outcome = self.countdown.tick();
        self.on_tick(outcome)
    }

    /// Deliver a wake-up that arrived `elapsed_secs` whole seconds after the
    /// previous one, applied according to the session's [`TickPolicy`].
    pub fn tick_elapsed(&mut self, elapsed_secs: u64) -> Option<Event> {
        let outcome = self.countdown.tick_elapsed(elapsed_secs, self.tick_policy);
        self.on_tick(outcome)
    }

    /// Move to the next step, or complete the session from the last one.
    ///
    /// Completion fires the recorder exactly once and submits the record to
    /// `sink`. Calling this on a complete session is a no-op.
    ///
    /// # Errors
    /// Returns `SessionError::CompletionPersistFailed` if `sink` rejects the
    /// record. The session stays complete regardless.
    pub fn advance<S>(&mut self, sink: &S) -> Result<Option<Event>, SessionError>
    where
        S: CompletionSink + ?Sized,
    {
        match self.sequencer.advance() {
            Move::NoOp => Ok(None),
            Move::Stepped { from, to } => {
                self.reset_countdown();
                tracing::info!(session_id = %self.id, from, to, "step advanced");
                Ok(Some(Event::StepAdvanced {
                    from_step: from,
                    to_step: to,
                    remaining_secs: self.remaining_secs(),
                    at: Utc::now(),
                }))
            }
            Move::Completed { .. } => {
                self.countdown.pause();
                let record = self.fire_completion();
                self.recorder.submit(sink)?;
                Ok(record.map(|record| Event::SessionCompleted {
                    record,
                    at: Utc::now(),
                }))
            }
        }
    }

    /// Move back one step. A no-op on the first step and once complete.
    pub fn retreat(&mut self) -> Option<Event> {
        match self.sequencer.retreat() {
            Move::Stepped { from, to } => {
                self.reset_countdown();
                tracing::info!(session_id = %self.id, from, to, "step retreated");
                Some(Event::StepRetreated {
                    from_step: from,
                    to_step: to,
                    remaining_secs: self.remaining_secs(),
                    at: Utc::now(),
                })
            }
            Move::Completed { .. } | Move::NoOp => None,
        }
    }

    /// Last write wins. The value lands in the completion record only if
    /// set before the session completes.
    pub fn set_mood_before(&mut self, mood: MoodSignal) -> Event {
        self.mood_before = Some(mood);
        self.mood_event(MoodSlot::Before, mood)
    }

    /// Last write wins. The value lands in the completion record only if
    /// set before the session completes.
    pub fn set_mood_after(&mut self, mood: MoodSignal) -> Event {
        self.mood_after = Some(mood);
        self.mood_event(MoodSlot::After, mood)
    }

    /// Resubmit the completion record after an earlier failure.
    ///
    /// Returns `Ok(false)` if there is nothing left to persist.
    pub fn retry_persist<S>(&mut self, sink: &S) -> Result<bool, SessionError>
    where
        S: CompletionSink + ?Sized,
    {
        self.recorder.submit(sink)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reset_countdown(&mut self) {
        let target = self
            .current_step()
            .map(|s| s.target_duration_secs)
            .unwrap_or(0);
        self.countdown.reset_to(target);
    }

    fn on_tick(&mut self, outcome: TickOutcome) -> Option<Event> {
        match outcome {
            TickOutcome::Ignored => None,
            TickOutcome::Counted => {
                tracing::trace!(remaining_secs = self.remaining_secs(), "tick");
                None
            }
            TickOutcome::ReachedZero => {
                let step = self.current_step()?;
                tracing::debug!(session_id = %self.id, step_id = %step.id, "time up");
                Some(Event::TimeUp {
                    step_index: self.sequencer.current(),
                    step_id: step.id.clone(),
                    at: Utc::now(),
                })
            }
        }
    }

    fn fire_completion(&mut self) -> Option<CompletionRecord> {
        let record = CompletionRecord {
            routine_id: self.routine_id.clone(),
            session_id: self.id,
            steps_completed: self.steps.len(),
            total_budgeted_secs: self.total_budgeted_secs(),
            mood_before: self.mood_before,
            mood_after: self.mood_after,
            completed_at: Utc::now(),
        };
        let fired = self.recorder.fire(move || record).cloned();
        if let Some(record) = &fired {
            tracing::info!(
                session_id = %record.session_id,
                routine_id = %record.routine_id,
                total_budgeted_secs = record.total_budgeted_secs,
                "session completed"
            );
        }
        fired
    }

    fn mood_event(&self, slot: MoodSlot, mood: MoodSignal) -> Event {
        tracing::debug!(session_id = %self.id, ?slot, %mood, "mood captured");
        Event::MoodCaptured {
            slot,
            mood,
            at: Utc::now(),
        }
    }
}
