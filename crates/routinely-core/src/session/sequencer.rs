use serde::{Deserialize, Serialize};

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Moved between two real steps.
    Stepped { from: usize, to: usize },
    /// Moved past the last step into the terminal position.
    Completed { from: usize },
    /// Out of range or already complete.
    NoOp,
}

/// Position within an ordered, non-empty list of steps.
///
/// `current` ranges over `0..=len`; `len` is the terminal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSequencer {
    len: usize,
    current: usize,
}

impl StepSequencer {
    /// `None` for an empty step list.
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { len, current: 0 })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.current == self.len
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.len
    }

    pub fn advance(&mut self) -> Move {
        if self.is_complete() {
            return Move::NoOp;
        }
        let from = self.current;
        self.current += 1;
        if self.is_complete() {
            Move::Completed { from }
        } else {
            Move::Stepped { from, to: self.current }
        }
    }

    pub fn retreat(&mut self) -> Move {
        if self.is_complete() || self.current == 0 {
            return Move::NoOp;
        }
        let from = self.current;
        self.current -= 1;
        Move::Stepped { from, to: self.current }
    }
}
