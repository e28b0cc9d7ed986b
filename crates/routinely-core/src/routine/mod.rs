mod mood;
mod step;

pub use mood::{MoodSignal, ParseMoodError};
pub use step::{Routine, RoutineStep};
pub(crate) use step::total_budgeted_secs;
