//! Three-byte channel voice messages.

use serde::{Deserialize, Serialize};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;

/// One discrete MIDI message: `(status | channel, data1, data2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    #[inline]
    fn channel_voice(kind: u8, channel: u8, data1: u8, data2: u8) -> Self {
        let channel = channel.min(15); // MIDI channels are 0-15
        Self {
            status: kind | channel,
            data1: data1 & 0x7F,
            data2: data2 & 0x7F,
        }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_voice(NOTE_ON, channel, note, velocity)
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_voice(NOTE_OFF, channel, note, velocity)
    }

    pub fn control_change(channel: u8, cc_number: u8, value: u8) -> Self {
        Self::channel_voice(CONTROL_CHANGE, channel, cc_number, value)
    }

    /// Parse raw bytes as delivered by an input callback. Missing data bytes
    /// read as 0; an empty slice or a data byte in status position is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        if status & 0x80 == 0 {
            return None;
        }
        Some(Self {
            status,
            data1: bytes.get(1).copied().unwrap_or(0),
            data2: bytes.get(2).copied().unwrap_or(0),
        })
    }

    #[inline]
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Upper status nibble (`0x80`, `0x90`, `0xB0`, ...).
    #[inline]
    pub fn kind(&self) -> u8 {
        self.status & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// Note-on with non-zero velocity.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind() == NOTE_ON && self.data2 != 0
    }

    /// Note-off, or note-on with zero velocity.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind() == NOTE_OFF || (self.kind() == NOTE_ON && self.data2 == 0)
    }

    #[inline]
    pub fn is_control_change(&self) -> bool {
        self.kind() == CONTROL_CHANGE
    }

    pub fn note(&self) -> Option<u8> {
        match self.kind() {
            NOTE_ON | NOTE_OFF => Some(self.data1),
            _ => None,
        }
    }

    pub fn velocity(&self) -> Option<u8> {
        match self.kind() {
            NOTE_ON | NOTE_OFF => Some(self.data2),
            _ => None,
        }
    }

    /// Controller value for CC messages.
    pub fn cc_value(&self) -> Option<u8> {
        self.is_control_change().then_some(self.data2)
    }
}

impl From<MidiMessage> for [u8; 3] {
    fn from(message: MidiMessage) -> Self {
        message.to_bytes()
    }
}
