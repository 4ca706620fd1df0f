//! MIDI side of the gesture conductor.
//!
//! Renders control behaviors into MIDI sequences, plays them to a sink on the
//! beat, and tracks held notes for the arpeggiator.
//!
//! Feature gates: `midi-io` (hardware I/O through midir, on by default).

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::{MidiMessage, CONTROL_CHANGE, NOTE_OFF, NOTE_ON};

pub mod waveform;
pub use waveform::Waveform;

mod rate;
pub use rate::RateBucket;

mod midi_builder;
pub use midi_builder::{
    BuildMode, MidiEventBuilder, DEFAULT_CC, DEFAULT_RAMP_THRESHOLD, DEFAULT_VELOCITY,
};

mod sink;
pub use sink::{MidiSink, NullSink, RecordedMessage, RecordingSink};

mod source;
pub use source::{virtual_input, ChannelInput, MidiInputSource};

pub mod arpeggiator;
pub use arpeggiator::{ArpDirection, Arpeggiator};

mod player;
pub use player::Player;

#[cfg(feature = "midi-io")]
pub(crate) mod io;

#[cfg(feature = "midi-io")]
pub use io::{MidiInputDevice, MidiInputPort, MidiOutputDevice, MidiOutputSink};
