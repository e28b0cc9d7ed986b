mod countdown;
mod recorder;
mod sequencer;
mod state;
mod ticker;

pub use countdown::{Countdown, TickOutcome, TickPolicy};
pub use recorder::{CompletionRecord, CompletionRecorder};
pub use sequencer::{Move, StepSequencer};
pub use state::RoutineSession;
pub use ticker::{run_ticker, TICK_PERIOD};
