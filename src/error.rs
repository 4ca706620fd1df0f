//! Centralized error type for the conductor umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] conductor_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] conductor_midi_io::Error),

    /// A manual tick was requested while the play loop owns playback.
    #[error("playback loop is running")]
    PlaybackRunning,

    #[error("unknown control: {0}")]
    UnknownControl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
