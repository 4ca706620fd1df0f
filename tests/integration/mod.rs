//! Integration test modules for conductor
//!
//! - engine: build, configuration, setters
//! - conditions: gesture conditions through `ingest`
//! - playback: ticks, play loop, sinks, arpeggiator

pub mod conditions;
pub mod engine;
pub mod playback;
