//! Property tests for the session state machine.

use proptest::prelude::*;
use routinely_core::{MemoryStore, RoutineSession, RoutineStep};

fn steps(durations: &[u64]) -> Vec<RoutineStep> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| RoutineStep::new(format!("s{i}"), i as i64, format!("Step {i}"), *d))
        .collect()
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Resume,
    Tick,
    Advance,
    Retreat,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        1 => Just(Op::Pause),
        1 => Just(Op::Resume),
        4 => Just(Op::Tick),
        1 => Just(Op::Advance),
        1 => Just(Op::Retreat),
    ]
}

proptest! {
    #[test]
    fn len_advances_complete_and_fire_once(durations in prop::collection::vec(0u64..300, 1..12)) {
        let store = MemoryStore::new();
        let mut session = RoutineSession::new("r", steps(&durations)).unwrap();
        session.start();
        for _ in 0..durations.len() {
            session.advance(&store).unwrap();
        }
        prop_assert!(session.is_complete());
        prop_assert!(!session.is_running());
        prop_assert_eq!(store.completions().len(), 1);
        prop_assert_eq!(store.completions()[0].total_budgeted_secs, durations.iter().sum::<u64>());

        session.advance(&store).unwrap();
        prop_assert!(session.retreat().is_none());
        prop_assert_eq!(session.current_index(), durations.len());
        prop_assert_eq!(store.completions().len(), 1);
    }

    #[test]
    fn pause_then_resume_leaks_no_time(
        durations in prop::collection::vec(1u64..300, 1..6),
        ticks in 0usize..400,
    ) {
        let mut session = RoutineSession::new("r", steps(&durations)).unwrap();
        session.start();
        for _ in 0..ticks {
            session.tick();
        }
        let before = session.remaining_secs();
        session.pause();
        session.pause();
        session.resume();
        prop_assert_eq!(session.remaining_secs(), before);
        prop_assert!(session.is_running());
    }

    #[test]
    fn transitions_reset_to_new_step_budget(
        durations in prop::collection::vec(0u64..300, 2..8),
        ops in prop::collection::vec(op(), 0..80),
    ) {
        let store = MemoryStore::new();
        let mut session = RoutineSession::new("r", steps(&durations)).unwrap();
        for op in ops {
            let index_before = session.current_index();
            match op {
                Op::Start => { session.start(); }
                Op::Pause => { session.pause(); }
                Op::Resume => { session.resume(); }
                Op::Tick => { session.tick(); }
                Op::Advance => { session.advance(&store).unwrap(); }
                Op::Retreat => { session.retreat(); }
            }
            let index = session.current_index();
            prop_assert!(index <= durations.len());
            if session.is_complete() {
                prop_assert!(!session.is_running());
            } else {
                prop_assert!(session.remaining_secs() <= durations[index]);
                if index != index_before {
                    prop_assert_eq!(session.remaining_secs(), durations[index]);
                }
            }
        }
        prop_assert!(store.completions().len() <= 1);
        prop_assert_eq!(store.completions().len() == 1, session.is_complete());
    }
}
