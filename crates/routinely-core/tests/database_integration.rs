//! Integration tests running sessions against the SQLite store.

use routinely_core::{
    Database, MoodSignal, Routine, RoutineSession, RoutineSource, SessionError, TickPolicy,
};

const MORNING: &str = r#"
id = "morning"
name = "Morning"

[[steps]]
id = "dress"
order = 2
label = "Get dressed"
icon = "shirt"
target_duration_secs = 300

[[steps]]
id = "wake"
order = 1
label = "Wake up"
target_duration_secs = 60

[[steps]]
id = "shoes"
order = 3
label = "Shoes on"
target_duration_secs = 0
"#;

#[test]
fn test_full_routine_workflow() {
    let db = Database::open_memory().unwrap();
    db.save_routine(&Routine::from_toml_str(MORNING).unwrap()).unwrap();

    let routine = db.load_routine("morning").unwrap();
    let mut session = RoutineSession::from_routine(routine).unwrap();
    assert_eq!(session.current_step().unwrap().id, "wake");

    session.set_mood_before(MoodSignal::Frustrated);
    session.start();
    for _ in 0..30 {
        session.tick();
    }
    session.advance(&db).unwrap();
    assert_eq!(session.current_step().unwrap().id, "dress");
    assert_eq!(session.remaining_secs(), 300);

    session.advance(&db).unwrap();
    assert!(session.is_time_up());
    session.set_mood_after(MoodSignal::Happy);
    session.advance(&db).unwrap();
    assert!(session.is_complete());
    assert!(session.is_persisted());

    let history = db.completions(Some("morning"), 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].steps_completed, 3);
    assert_eq!(history[0].total_budgeted_secs, 360);
    assert_eq!(history[0].mood_before, Some(MoodSignal::Frustrated));
    assert_eq!(history[0].mood_after, Some(MoodSignal::Happy));
    assert_eq!(history[0].session_id, session.id());
}

#[test]
fn test_history_is_append_only() {
    let db = Database::open_memory().unwrap();
    db.save_routine(&Routine::from_toml_str(MORNING).unwrap()).unwrap();

    for _ in 0..3 {
        let mut session = RoutineSession::from_routine(db.load_routine("morning").unwrap()).unwrap();
        for _ in 0..3 {
            session.advance(&db).unwrap();
        }
    }
    assert_eq!(db.completions(Some("morning"), 10).unwrap().len(), 3);
}

#[test]
fn test_persist_failure_on_broken_table() {
    let db = Database::open_memory().unwrap();
    db.save_routine(&Routine::from_toml_str(MORNING).unwrap()).unwrap();
    let mut session = RoutineSession::from_routine(db.load_routine("morning").unwrap()).unwrap();
    session.advance(&db).unwrap();
    session.advance(&db).unwrap();

    db.conn().execute_batch("DROP TABLE completions;").unwrap();
    let err = session.advance(&db).unwrap_err();
    assert!(matches!(err, SessionError::CompletionPersistFailed { .. }));
    assert!(session.is_complete());
    assert!(session.completion_record().is_some());
}

#[test]
fn test_stored_session_resumes_with_policy() {
    let db = Database::open_memory().unwrap();
    db.save_routine(&Routine::from_toml_str(MORNING).unwrap()).unwrap();
    let mut session = RoutineSession::from_routine(db.load_routine("morning").unwrap())
        .unwrap()
        .with_tick_policy(TickPolicy::CatchUp);
    session.start();

    db.kv_set("active_session", &serde_json::to_string(&session).unwrap()).unwrap();
    let json = db.kv_get("active_session").unwrap().unwrap();
    let mut restored: RoutineSession = serde_json::from_str(&json).unwrap();

    restored.tick_elapsed(45);
    assert_eq!(restored.tick_policy(), TickPolicy::CatchUp);
    assert_eq!(restored.remaining_secs(), 15);
}
