//! Timed delivery of one rendered sequence to a sink.

use crate::error::Result;
use crate::event::MidiMessage;
use crate::sink::MidiSink;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct Player {
    sink: Arc<dyn MidiSink>,
}

impl Player {
    pub fn new(sink: Arc<dyn MidiSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn MidiSink> {
        &self.sink
    }

    /// Send `messages` in order, `time_slice` apart.
    ///
    /// Nothing is sent when `gate` is off. The first sink failure ends the
    /// sequence and is returned; it is not retried. Returns the number of
    /// messages delivered.
    pub fn play(&self, messages: &[MidiMessage], time_slice: Duration, gate: bool) -> Result<usize> {
        if !gate || messages.is_empty() {
            return Ok(0);
        }
        for (index, message) in messages.iter().enumerate() {
            if index > 0 {
                thread::sleep(time_slice);
            }
            self.sink.send(message)?;
        }
        debug!(count = messages.len(), slice = ?time_slice, "sequence played");
        Ok(messages.len())
    }
}
