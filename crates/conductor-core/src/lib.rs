//! Timing and decision kernel for the gesture conductor.
//!
//! # Primary API
//!
//! - [`Metronome`]: beat clock, per-event time slices
//! - [`PredictionHistory`]: bounded record of classifier labels
//! - [`Condition`]: hold / transition gesture tests with a noise budget
//!
//! # Example
//!
//! ```ignore
//! use conductor_core::{Condition, GestureHold, HistoryBounds, Metronome, PredictionHistory};
//!
//! let metronome = Metronome::new(120.0)?;
//! let slice = metronome.time_slice(25);
//!
//! let mut history = PredictionHistory::new(HistoryBounds::default())?;
//! history.push(1);
//!
//! let hold = Condition::hold(GestureHold::new(1, 3), GestureHold::new(0, 3));
//! let active = hold.evaluate(false, history.as_slice());
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod condition;
pub use condition::{noise_budget, Condition, GestureHold, GestureTransition};

pub mod history;
pub use history::{
    HistoryBounds, PredictionHistory, DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_KEEP,
};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag};

pub(crate) mod transport;
pub use transport::Metronome;
