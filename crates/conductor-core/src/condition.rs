//! Gesture conditions deciding when a control switches on or off.
//!
//! A condition looks only at the trailing end of the prediction history. Each
//! check tolerates a small share of misclassified samples (the noise budget):
//! one in ten, rounded down, with strictly fewer mismatches than the budget
//! allowed. A perfectly clean window always passes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Mismatches tolerated in a window of `threshold` samples.
#[inline]
pub fn noise_budget(threshold: usize) -> usize {
    threshold / 10
}

#[inline]
fn within_noise_budget(mismatches: usize, threshold: usize) -> bool {
    mismatches == 0 || mismatches < noise_budget(threshold)
}

/// "`gesture` held for `threshold` consecutive predictions".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureHold {
    pub gesture: i32,
    pub threshold: usize,
}

impl GestureHold {
    pub const fn new(gesture: i32, threshold: usize) -> Self {
        Self { gesture, threshold }
    }

    /// Check the trailing `threshold` predictions.
    pub fn check(&self, history: &[i32]) -> Result<bool> {
        self.check_before(history, 0)
    }

    /// Check the `threshold` predictions that end `skip` entries before the
    /// most recent one.
    fn check_before(&self, history: &[i32], skip: usize) -> Result<bool> {
        let needed = self.threshold + skip;
        if history.len() < needed {
            return Err(Error::IncompleteHistory {
                needed,
                available: history.len(),
            });
        }

        let end = history.len() - skip;
        let window = &history[end - self.threshold..end];
        let mismatches = window.iter().filter(|&&label| label != self.gesture).count();
        Ok(within_noise_budget(mismatches, self.threshold))
    }

    fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::InvalidConfig(format!(
                "threshold for gesture {} must be at least 1",
                self.gesture
            )));
        }
        Ok(())
    }
}

/// "`first` held, immediately followed by `second` held" (`second` is the
/// most recent stretch of predictions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureTransition {
    pub first: GestureHold,
    pub second: GestureHold,
}

impl GestureTransition {
    pub const fn new(first: GestureHold, second: GestureHold) -> Self {
        Self { first, second }
    }

    pub fn check(&self, history: &[i32]) -> Result<bool> {
        let needed = self.first.threshold + self.second.threshold;
        if history.len() < needed {
            return Err(Error::IncompleteHistory {
                needed,
                available: history.len(),
            });
        }
        Ok(self.second.check(history)?
            && self.first.check_before(history, self.second.threshold)?)
    }

    fn validate(&self) -> Result<()> {
        self.first.validate()?;
        self.second.validate()
    }
}

/// When a control turns on and when it turns back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Inactive controls test `on`, active controls test `off`.
    Hold { on: GestureHold, off: GestureHold },
    /// Same as `Hold`, with two-gesture sequences.
    Transition {
        on: GestureTransition,
        off: GestureTransition,
    },
    /// Fixed state, never transitions.
    NoAction { active: bool },
}

impl Condition {
    pub fn hold(on: GestureHold, off: GestureHold) -> Self {
        Condition::Hold { on, off }
    }

    pub fn transition(on: GestureTransition, off: GestureTransition) -> Self {
        Condition::Transition { on, off }
    }

    /// State a freshly configured control starts in.
    pub fn initial_state(&self) -> bool {
        match self {
            Condition::NoAction { active } => *active,
            _ => false,
        }
    }

    /// Decide the next activation state from the current one.
    ///
    /// Returns `IncompleteHistory` when the window needed for the current
    /// state's test is not filled yet; the caller keeps the current state.
    pub fn evaluate(&self, active: bool, history: &[i32]) -> Result<bool> {
        match self {
            Condition::Hold { on, off } => {
                if active {
                    Ok(!off.check(history)?)
                } else {
                    on.check(history)
                }
            }
            Condition::Transition { on, off } => {
                if active {
                    Ok(!off.check(history)?)
                } else {
                    on.check(history)
                }
            }
            Condition::NoAction { active: fixed } => Ok(*fixed),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Condition::Hold { on, off } => {
                on.validate()?;
                off.validate()
            }
            Condition::Transition { on, off } => {
                on.validate()?;
                off.validate()
            }
            Condition::NoAction { .. } => Ok(()),
        }
    }
}
