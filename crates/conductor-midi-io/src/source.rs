//! Polled MIDI inputs feeding the arpeggiator.

use crate::error::{Error, Result};
use crate::event::MidiMessage;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Non-blocking pull of incoming MIDI messages.
///
/// `Ok(None)` means nothing is pending right now. A source that can never
/// deliver again reports [`Error::PortClosed`].
pub trait MidiInputSource: Send {
    fn poll(&mut self) -> Result<Option<MidiMessage>>;
}

/// Input backed by a crossbeam channel.
///
/// Used for virtual keyboards and tests; closes once every sender is dropped.
pub struct ChannelInput {
    receiver: Receiver<MidiMessage>,
}

impl ChannelInput {
    pub fn new(receiver: Receiver<MidiMessage>) -> Self {
        Self { receiver }
    }
}

impl MidiInputSource for ChannelInput {
    fn poll(&mut self) -> Result<Option<MidiMessage>> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(Error::PortClosed("input channel disconnected".to_string()))
            }
        }
    }
}

/// Bounded virtual input: the sender half plays the keyboard.
pub fn virtual_input(capacity: usize) -> (Sender<MidiMessage>, ChannelInput) {
    let (sender, receiver) = bounded(capacity);
    (sender, ChannelInput::new(receiver))
}
