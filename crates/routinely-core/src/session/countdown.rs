//! Per-step countdown.
//!
//! The countdown owns no clock. Something external delivers wake-ups
//! (`tick` for exactly one second, `tick_elapsed` for a late wake-up) and the
//! countdown applies them according to a [`TickPolicy`].
//!
//! Reaching zero is informational only: it never stops the countdown and
//! never moves the session to another step.

use serde::{Deserialize, Serialize};

/// How a wake-up that arrives late is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Every wake-up counts as exactly one second, however late it is.
    #[default]
    Discrete,
    /// A wake-up applies every whole second elapsed since the previous one.
    CatchUp,
}

/// Result of delivering a wake-up to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or nothing left to count down.
    Ignored,
    /// Remaining time went down but is still above zero.
    Counted,
    /// This wake-up brought remaining time to zero.
    ReachedZero,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    target_secs: u64,
    remaining_secs: u64,
    running: bool,
}

impl Countdown {
    /// A stopped countdown loaded with `target_secs`.
    pub fn new(target_secs: u64) -> Self {
        Self {
            target_secs,
            remaining_secs: target_secs,
            running: false,
        }
    }

    pub fn target_secs(&self) -> u64 {
        self.target_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.target_secs - self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_time_up(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Load a new step's budget. The running flag is left as it was.
    pub fn reset_to(&mut self, target_secs: u64) {
        self.target_secs = target_secs;
        self.remaining_secs = target_secs;
    }

    /// Returns `false` if already running.
    pub fn resume(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Returns `false` if already paused.
    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// One second of wall-clock time.
    pub fn tick(&mut self) -> TickOutcome {
        self.count_down(1)
    }

    /// A wake-up arriving `elapsed_secs` whole seconds after the previous one.
    pub fn tick_elapsed(&mut self, elapsed_secs: u64, policy: TickPolicy) -> TickOutcome {
        if elapsed_secs == 0 {
            return TickOutcome::Ignored;
        }
        match policy {
            TickPolicy::Discrete => self.count_down(1),
            TickPolicy::CatchUp => self.count_down(elapsed_secs),
        }
    }

    fn count_down(&mut self, secs: u64) -> TickOutcome {
        if !self.running || self.remaining_secs == 0 {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(secs);
        if self.remaining_secs == 0 {
            TickOutcome::ReachedZero
        } else {
            TickOutcome::Counted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(target: u64) -> Countdown {
        let mut c = Countdown::new(target);
        c.resume();
        c
    }

    #[test]
    fn stopped_countdown_ignores_ticks() {
        let mut c = Countdown::new(10);
        assert_eq!(c.tick(), TickOutcome::Ignored);
        assert_eq!(c.remaining_secs(), 10);
    }

    #[test]
    fn reaching_zero_is_reported_once_and_keeps_running() {
        let mut c = running(2);
        assert_eq!(c.tick(), TickOutcome::Counted);
        assert_eq!(c.tick(), TickOutcome::ReachedZero);
        assert_eq!(c.tick(), TickOutcome::Ignored);
        assert!(c.is_running());
        assert!(c.is_time_up());
    }

    #[test]
    fn discrete_policy_never_catches_up() {
        let mut c = running(60);
        assert_eq!(c.tick_elapsed(45, TickPolicy::Discrete), TickOutcome::Counted);
        assert_eq!(c.remaining_secs(), 59);
    }

    #[test]
    fn catch_up_policy_applies_all_elapsed_seconds() {
        let mut c = running(60);
        assert_eq!(c.tick_elapsed(45, TickPolicy::CatchUp), TickOutcome::Counted);
        assert_eq!(c.remaining_secs(), 15);
        assert_eq!(c.tick_elapsed(100, TickPolicy::CatchUp), TickOutcome::ReachedZero);
        assert_eq!(c.remaining_secs(), 0);
    }

    #[test]
    fn zero_second_wake_up_is_ignored() {
        let mut c = running(5);
        assert_eq!(c.tick_elapsed(0, TickPolicy::Discrete), TickOutcome::Ignored);
        assert_eq!(c.remaining_secs(), 5);
    }

    #[test]
    fn pause_keeps_remaining_and_is_idempotent() {
        let mut c = running(30);
        c.tick();
        assert!(c.pause());
        assert!(!c.pause());
        assert_eq!(c.remaining_secs(), 29);
        assert_eq!(c.tick(), TickOutcome::Ignored);
        assert!(c.resume());
        assert_eq!(c.remaining_secs(), 29);
    }

    #[test]
    fn reset_loads_new_budget_without_touching_running_flag() {
        let mut c = running(30);
        c.tick();
        c.reset_to(5);
        assert_eq!(c.remaining_secs(), 5);
        assert_eq!(c.elapsed_secs(), 0);
        assert!(c.is_running());
    }
}
