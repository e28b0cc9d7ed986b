use std::ops::ControlFlow;

use clap::{Subcommand, ValueEnum};
use routinely_core::error::Result as CoreResult;
use routinely_core::storage::Database;
use routinely_core::{
    run_ticker, Config, Event, MoodSignal, RoutineSession, RoutineSource, SessionError, TICK_PERIOD,
};
use serde::{Deserialize, Serialize};

const SESSION_KEY: &str = "active_session";
const NO_SESSION: &str = "no session in progress; run `session begin <routine>`";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Begin a session of a stored routine
    Begin {
        /// Routine ID (defaults to `default_routine` from config)
        routine: Option<String>,
        /// Mood captured before starting
        #[arg(long)]
        mood_before: Option<MoodSignal>,
        /// Replace a session that is still in progress
        #[arg(long)]
        force: bool,
    },
    /// Print current session state as JSON
    Status,
    /// Start (or resume) the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Resume the countdown
    Resume,
    /// Finish the current step and move on
    Next,
    /// Go back one step
    Back,
    /// Capture a mood signal
    Mood {
        #[arg(value_enum)]
        slot: MoodSlotArg,
        mood: MoodSignal,
    },
    /// Tick once per second until the current step's time is up
    Watch,
    /// Resubmit a completion that failed to persist
    RetryPersist,
    /// Discard the current session without recording it
    Abandon,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MoodSlotArg {
    Before,
    After,
}

/// The in-progress session as kept between invocations.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    session: RoutineSession,
    /// Epoch milliseconds of the last wake-up delivered while running.
    #[serde(default)]
    last_wake_ms: Option<i64>,
}

impl StoredSession {
    fn new(session: RoutineSession) -> Self {
        Self {
            session,
            last_wake_ms: None,
        }
    }

    /// Deliver the wall-clock time that passed since the previous wake-up.
    /// Sub-second remainders carry over to the next invocation.
    fn wake(&mut self, now_ms: i64) -> Option<Event> {
        if !self.session.is_running() {
            self.last_wake_ms = None;
            return None;
        }
        let Some(last) = self.last_wake_ms else {
            self.last_wake_ms = Some(now_ms);
            return None;
        };
        let elapsed_secs = now_ms.saturating_sub(last).max(0) / 1000;
        if elapsed_secs == 0 {
            return None;
        }
        self.last_wake_ms = Some(last + elapsed_secs * 1000);
        self.session.tick_elapsed(elapsed_secs as u64)
    }

    /// Restart wall-clock accounting after a command changed the step or
    /// the running flag.
    fn rearm(&mut self, now_ms: i64) {
        self.last_wake_ms = self.session.is_running().then_some(now_ms);
    }
}

fn position(session: &RoutineSession) -> (usize, bool) {
    (session.current_index(), session.is_running())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn decode(json: &str) -> CoreResult<StoredSession> {
    Ok(serde_json::from_str(json)?)
}

fn encode(stored: &StoredSession) -> CoreResult<String> {
    Ok(serde_json::to_string(stored)?)
}

/// The stored session together with the exact JSON it was read from.
fn load_stored_raw(db: &Database) -> CoreResult<Option<(String, StoredSession)>> {
    match db.kv_get(SESSION_KEY)? {
        Some(json) => {
            let stored = decode(&json)?;
            Ok(Some((json, stored)))
        }
        None => Ok(None),
    }
}

fn load_stored(db: &Database) -> CoreResult<Option<StoredSession>> {
    Ok(load_stored_raw(db)?.map(|(_, stored)| stored))
}

fn require_stored(db: &Database) -> Result<StoredSession, Box<dyn std::error::Error>> {
    load_stored(db)?.ok_or_else(|| NO_SESSION.into())
}

fn save_stored(db: &Database, stored: &StoredSession) -> CoreResult<()> {
    db.kv_set(SESSION_KEY, &encode(stored)?)?;
    Ok(())
}

/// Build a session over the stored routine, snapshotting its steps.
fn new_session(db: &Database, routine_id: &str, config: &Config) -> CoreResult<RoutineSession> {
    let routine = db.load_routine(routine_id)?;
    Ok(RoutineSession::from_routine(routine)?.with_tick_policy(config.session.tick_policy))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One compact JSON document per line, for `watch`.
fn print_line<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print the command's event, or the snapshot when the command was a no-op.
fn print_outcome(session: &RoutineSession, event: Option<Event>) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&session.snapshot()),
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionAction::Begin {
            routine,
            mood_before,
            force,
        } => begin(&db, routine, mood_before, force),
        SessionAction::Abandon => {
            if db.kv_delete(SESSION_KEY)? {
                tracing::info!("session abandoned");
                println!("{{\"type\": \"SessionAbandoned\"}}");
            } else {
                println!("no session in progress");
            }
            Ok(())
        }
        SessionAction::Watch => watch(&db),
        action => {
            let mut stored = require_stored(&db)?;
            let now = now_ms();
            // A time-up reached here is visible as `is_time_up` in the snapshot.
            stored.wake(now);
            let before = position(&stored.session);
            let result = apply(&db, &mut stored, action);
            if position(&stored.session) != before {
                stored.rearm(now);
            }
            save_stored(&db, &stored)?;
            result
        }
    }
}

fn begin(
    db: &Database,
    routine: Option<String>,
    mood_before: Option<MoodSignal>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    if let Some(existing) = load_stored(db)? {
        let previous = &existing.session;
        if !force && !previous.is_complete() {
            return Err(format!(
                "a session of '{}' is still in progress; use --force or `session abandon`",
                previous.routine_id()
            )
            .into());
        }
        if !force && !previous.is_persisted() {
            return Err(format!(
                "the completion of '{}' was never stored; run `session retry-persist` or use --force",
                previous.routine_id()
            )
            .into());
        }
    }

    let routine_id = routine
        .or_else(|| config.default_routine.clone())
        .ok_or("no routine given and no default_routine configured")?;
    let mut session = new_session(db, &routine_id, &config)?;

    if let Some(mood) = mood_before {
        session.set_mood_before(mood);
    }
    let event = if config.session.auto_start {
        session.start()
    } else {
        None
    };

    let mut stored = StoredSession::new(session);
    stored.rearm(now_ms());
    save_stored(db, &stored)?;
    print_outcome(&stored.session, event)
}

fn apply(
    db: &Database,
    stored: &mut StoredSession,
    action: SessionAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = &mut stored.session;
    let event = match action {
        SessionAction::Status => None,
        SessionAction::Start => session.start(),
        SessionAction::Pause => session.pause(),
        SessionAction::Resume => session.resume(),
        SessionAction::Back => session.retreat(),
        SessionAction::Next => match session.advance(db) {
            Ok(event) => event,
            Err(e @ SessionError::CompletionPersistFailed { .. }) => {
                if let Some(record) = session.completion_record() {
                    print_json(record)?;
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        },
        SessionAction::Mood { slot, mood } => Some(match slot {
            MoodSlotArg::Before => session.set_mood_before(mood),
            MoodSlotArg::After => session.set_mood_after(mood),
        }),
        SessionAction::RetryPersist => {
            if session.retry_persist(db)? {
                println!("completion persisted");
            } else {
                println!("nothing to persist");
            }
            return Ok(());
        }
        SessionAction::Begin { .. } | SessionAction::Watch | SessionAction::Abandon => None,
    };
    print_outcome(session, event)
}

/// Tick the stored session once per second until time is up.
///
/// Each tick is written back only while the stored row still holds what this
/// watcher last wrote. Any other command that changes the session wins and
/// ends the watch.
fn watch(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let (raw, mut stored) = load_stored_raw(db)?.ok_or(NO_SESSION)?;
    let now = now_ms();
    stored.wake(now);
    stored.rearm(now);
    let mut owned = encode(&stored)?;
    if !db.kv_replace(SESSION_KEY, &raw, &owned)? {
        return Err("the session changed while watch was starting; try again".into());
    }

    if !stored.session.is_running() || stored.session.is_time_up() {
        return print_line(&stored.session.snapshot());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut failure = None;
    let mut superseded = false;
    let StoredSession { mut session, .. } = stored;
    runtime.block_on(run_ticker(&mut session, TICK_PERIOD, |session, event| {
        let mut next = StoredSession::new(session.clone());
        next.rearm(now_ms());
        let written = encode(&next).and_then(|json| {
            let replaced = db.kv_replace(SESSION_KEY, &owned, &json)?;
            Ok(replaced.then_some(json))
        });
        match written {
            Ok(Some(json)) => owned = json,
            Ok(None) => {
                superseded = true;
                return ControlFlow::Break(());
            }
            Err(e) => {
                failure = Some(e);
                return ControlFlow::Break(());
            }
        }

        let line = match &event {
            Some(event) => serde_json::to_string(event),
            None => serde_json::to_string(&session.snapshot()),
        };
        if let Ok(line) = line {
            println!("{line}");
        }

        match event {
            Some(Event::TimeUp { .. }) => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }));

    if let Some(e) = failure {
        return Err(e.into());
    }
    if superseded {
        tracing::info!("session changed by another command, watch stopped");
        if let Some(current) = load_stored(db)? {
            print_line(&current.session.snapshot())?;
        }
    }
    Ok(())
}
