//! Async wake-up source for a running session.
//!
//! Delivers one `tick()` per period while the session is running. Late
//! wake-ups are delayed rather than burst, so a stalled runtime never
//! replays missed seconds.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::state::RoutineSession;
use crate::events::Event;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tick `session` every `period` until it stops running or `on_tick`
/// breaks. Returns the number of ticks delivered.
///
/// `on_tick` sees the session after each tick together with the tick's
/// event, if any. It may pause or advance the session.
pub async fn run_ticker<F>(session: &mut RoutineSession, period: Duration, mut on_tick: F) -> u64
where
    F: FnMut(&mut RoutineSession, Option<Event>) -> ControlFlow<()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    interval.tick().await;

    let mut delivered = 0;
    while session.is_running() {
        interval.tick().await;
        let event = session.tick();
        delivered += 1;
        if on_tick(session, event).is_break() {
            break;
        }
    }
    tracing::debug!(session_id = %session.id(), delivered, "ticker stopped");
    delivered
}
