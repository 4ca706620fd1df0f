//! Beat clock.

mod metronome;

pub use metronome::Metronome;
