//! # Conductor - gesture conducting engine
//!
//! Turns a live stream of classified gestures into beat-synchronized MIDI.
//!
//! ## Architecture
//!
//! Conductor is an umbrella crate that coordinates:
//! - **conductor-core** - Beat clock, prediction history, gesture conditions
//! - **conductor-midi-io** - Event rendering, arpeggiator, playback, MIDI hardware I/O
//!
//! Each [`Control`] watches the prediction history through its [`Condition`]
//! and, while active, renders its [`Behavior`] into a MIDI sequence spread
//! across one beat.
//!
//! ## Quick Start
//!
//! ```ignore
//! use conductor::prelude::*;
//!
//! let mut engine = ConductingEngine::builder()
//!     .bpm(120.0)
//!     .sink(Arc::new(RecordingSink::new()))
//!     .control(ControlConfig::new(
//!         "swell",
//!         Condition::hold(GestureHold::new(1, 3), GestureHold::new(0, 3)),
//!         Behavior::modulate(0, Waveform::Sine, RateBucket::Quarter),
//!     ))
//!     .build()?;
//!
//! for label in [1, 1, 1] {
//!     engine.ingest(label)?;
//! }
//! engine.tick()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware MIDI I/O
//! - `midi-io` - `MidiOutputSink` / `MidiInputPort` via midir

/// Re-export of conductor-core for direct access
pub use conductor_core as core;

/// Re-export of conductor-midi-io for direct access
pub use conductor_midi_io as midi;

pub use conductor_core::{
    noise_budget, Condition, GestureHold, GestureTransition, HistoryBounds, Metronome,
    PredictionHistory,
};

pub use conductor_midi_io::{
    virtual_input, ArpDirection, Arpeggiator, ChannelInput, MidiInputSource, MidiMessage,
    MidiSink, NullSink, RateBucket, RecordingSink, Waveform,
};

#[cfg(feature = "midi-io")]
pub use conductor_midi_io::{MidiInputPort, MidiOutputSink};

mod error;
pub use error::{Error, Result};

mod config;
pub use config::{ArpeggiatorConfig, Behavior, ControlConfig, EngineConfig, DEFAULT_BPM};

mod control;
pub use control::{Control, PlaybackSlot};

mod builder;
mod engine;

pub use builder::ConductingEngineBuilder;
pub use engine::{
    ConductingEngine, IngestReport, PlaybackFailure, TickReport, Transition, SENSOR_RANGE,
};

/// Everything needed to configure and run an engine.
pub mod prelude {
    // Main engine
    pub use crate::{ConductingEngine, ConductingEngineBuilder};

    // Configuration
    pub use crate::{Behavior, ControlConfig, EngineConfig};
    pub use crate::{Condition, GestureHold, GestureTransition, HistoryBounds};
    pub use crate::{ArpDirection, RateBucket, Waveform};

    // MIDI
    pub use crate::{MidiMessage, MidiSink, NullSink, RecordingSink};

    #[cfg(feature = "midi-io")]
    pub use crate::{MidiInputPort, MidiOutputSink};

    pub use std::sync::Arc;
}
