//! Destinations for rendered MIDI messages.

use crate::error::{Error, Result};
use crate::event::MidiMessage;
use conductor_core::AtomicFlag;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Anything that can take one MIDI message at a time.
///
/// Shared by every playback thread of a tick, so implementations must be
/// callable concurrently.
pub trait MidiSink: Send + Sync {
    fn send(&self, message: &MidiMessage) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MidiSink for NullSink {
    #[inline]
    fn send(&self, _message: &MidiMessage) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedMessage {
    /// Offset from sink creation (or the last [`RecordingSink::clear`]).
    pub at: Duration,
    pub message: MidiMessage,
}

/// Captures every message with a timestamp.
///
/// Can be switched unavailable to exercise failure paths.
pub struct RecordingSink {
    origin: Mutex<Instant>,
    messages: Mutex<Vec<RecordedMessage>>,
    available: AtomicFlag,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            origin: Mutex::new(Instant::now()),
            messages: Mutex::new(Vec::new()),
            available: AtomicFlag::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn recorded(&self) -> Vec<RecordedMessage> {
        self.messages.lock().clone()
    }

    pub fn messages(&self) -> Vec<MidiMessage> {
        self.messages.lock().iter().map(|r| r.message).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
        *self.origin.lock() = Instant::now();
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSink for RecordingSink {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        if !self.available.get() {
            return Err(Error::SinkUnavailable("recording sink disabled".to_string()));
        }
        let at = self.origin.lock().elapsed();
        self.messages.lock().push(RecordedMessage {
            at,
            message: *message,
        });
        Ok(())
    }
}

impl<S: MidiSink + ?Sized> MidiSink for std::sync::Arc<S> {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        (**self).send(message)
    }
}
