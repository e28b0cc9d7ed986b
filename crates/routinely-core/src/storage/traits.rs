use crate::error::{SinkError, SourceError};
use crate::routine::Routine;
use crate::session::CompletionRecord;

/// Read side: where routine definitions come from.
///
/// A loaded routine is a snapshot; sessions never re-fetch it.
pub trait RoutineSource {
    /// Load a routine with its steps ordered by `order`.
    fn load_routine(&self, routine_id: &str) -> Result<Routine, SourceError>;
}

/// Write side: where completion records go.
///
/// Sinks are append-only. Every accepted record adds a history entry keyed
/// by `record.routine_id`; nothing is overwritten.
pub trait CompletionSink {
    fn submit(&self, record: &CompletionRecord) -> Result<(), SinkError>;
}

impl<T: RoutineSource + ?Sized> RoutineSource for &T {
    fn load_routine(&self, routine_id: &str) -> Result<Routine, SourceError> {
        (**self).load_routine(routine_id)
    }
}

impl<T: CompletionSink + ?Sized> CompletionSink for &T {
    fn submit(&self, record: &CompletionRecord) -> Result<(), SinkError> {
        (**self).submit(record)
    }
}

impl<T: CompletionSink + ?Sized> CompletionSink for std::sync::Arc<T> {
    fn submit(&self, record: &CompletionRecord) -> Result<(), SinkError> {
        (**self).submit(record)
    }
}
