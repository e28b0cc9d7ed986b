//! # Routinely Core Library
//!
//! This library provides the core logic for guided routines: walking a user
//! through an ordered list of timed steps (a bedtime or morning routine),
//! counting down each step's budget, capturing mood before and after, and
//! recording a single completion when the routine is finished.
//!
//! ## Architecture
//!
//! - **Session Engine**: A clockless state machine. The caller delivers one
//!   `tick()` per second while running and moves between steps explicitly
//! - **Storage**: SQLite-based routine and completion storage and TOML-based
//!   configuration, behind the [`RoutineSource`] and [`CompletionSink`] traits
//! - **Ticker**: An optional tokio interval that feeds ticks to a session
//!
//! ## Key Components
//!
//! - [`RoutineSession`]: Session state machine
//! - [`CompletionRecord`]: What a finished session hands to storage
//! - [`Database`]: Routine and completion persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod routine;
pub mod session;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, SessionError, SinkError, SourceError};
pub use events::{Event, MoodSlot};
pub use routine::{MoodSignal, Routine, RoutineStep};
pub use session::{run_ticker, CompletionRecord, RoutineSession, TickPolicy, TICK_PERIOD};
pub use storage::{CompletionSink, Config, Database, MemoryStore, RoutineSource};
