//! Renders a control's behavior into an ordered MIDI message sequence.
//!
//! Rendering is pure with respect to I/O: it never blocks and never touches a
//! sink. The only state it carries between renders is the previous sensor
//! reading used by [`BuildMode::SensorRamp`].

use crate::event::MidiMessage;
use crate::rate::RateBucket;
use crate::waveform::{to_controller_value, Waveform};
use tracing::debug;

pub const DEFAULT_VELOCITY: u8 = 64;
pub const DEFAULT_CC: u8 = 75;
pub const DEFAULT_RAMP_THRESHOLD: u8 = 1;

/// What a builder produces on [`MidiEventBuilder::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildMode {
    /// Note-on/note-off pairs for the current note list.
    Notes { velocity: u8 },
    /// One waveform period of CC values, repeated per subdivision.
    Modulate {
        cc: u8,
        waveform: Waveform,
        invert: bool,
        min: u8,
        max: u8,
    },
    /// CC ramp from the previous sensor reading to the latest one.
    SensorRamp { cc: u8, threshold: u8 },
    Disabled,
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Modulate {
            cc: DEFAULT_CC,
            waveform: Waveform::Sine,
            invert: false,
            min: 0,
            max: 127,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MidiEventBuilder {
    channel: u8,
    rate: RateBucket,
    mode: BuildMode,
    notes: Vec<u8>,
    previous_reading: u8,
    reading: u8,
}

impl MidiEventBuilder {
    pub fn new(channel: u8, mode: BuildMode) -> Self {
        Self {
            channel: channel.min(15),
            rate: RateBucket::default(),
            mode,
            notes: Vec::new(),
            previous_reading: 0,
            reading: 0,
        }
    }

    pub fn with_rate(mut self, rate: RateBucket) -> Self {
        self.rate = rate;
        self
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn rate(&self) -> RateBucket {
        self.rate
    }

    pub fn set_rate(&mut self, rate: RateBucket) {
        self.rate = rate;
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BuildMode) {
        self.mode = mode;
    }

    /// Note list used by [`BuildMode::Notes`], in play order.
    pub fn set_notes(&mut self, notes: Vec<u8>) {
        self.notes = notes;
    }

    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    /// Latest sensor reading for [`BuildMode::SensorRamp`].
    pub fn set_reading(&mut self, reading: u8) {
        self.reading = reading.min(127);
    }

    pub fn previous_reading(&self) -> u8 {
        self.previous_reading
    }

    pub fn render(&mut self) -> Vec<MidiMessage> {
        let messages = match self.mode {
            BuildMode::Notes { velocity } => self.render_notes(velocity),
            BuildMode::Modulate {
                cc,
                waveform,
                invert,
                min,
                max,
            } => self.render_modulation(cc, waveform, invert, min, max),
            BuildMode::SensorRamp { cc, threshold } => self.render_ramp(cc, threshold),
            BuildMode::Disabled => Vec::new(),
        };
        debug!(
            channel = self.channel,
            rate = %self.rate.symbol(),
            count = messages.len(),
            "rendered MIDI sequence"
        );
        messages
    }

    fn render_notes(&self, velocity: u8) -> Vec<MidiMessage> {
        let repeats = self.rate.multiplier() as usize;
        let mut messages = Vec::with_capacity(repeats * self.notes.len() * 2);
        for _ in 0..repeats {
            for &note in &self.notes {
                messages.push(MidiMessage::note_on(self.channel, note, velocity));
                messages.push(MidiMessage::note_off(self.channel, note, 0));
            }
        }
        messages
    }

    fn render_modulation(
        &self,
        cc: u8,
        waveform: Waveform,
        invert: bool,
        min: u8,
        max: u8,
    ) -> Vec<MidiMessage> {
        let multiplier = self.rate.multiplier();
        let period: Vec<MidiMessage> = waveform
            .period(multiplier, invert)
            .into_iter()
            .map(|sample| {
                MidiMessage::control_change(self.channel, cc, to_controller_value(sample, min, max))
            })
            .collect();

        let mut messages = Vec::with_capacity(period.len() * multiplier as usize);
        for _ in 0..multiplier {
            messages.extend_from_slice(&period);
        }
        messages
    }

    fn render_ramp(&mut self, cc: u8, threshold: u8) -> Vec<MidiMessage> {
        let old = self.previous_reading;
        let new = self.reading;
        self.previous_reading = new;

        if old.abs_diff(new) <= threshold {
            return Vec::new();
        }
        let mut path: Vec<u8> = (old.min(new)..=old.max(new)).collect();
        if new < old {
            path.reverse();
        }
        path.into_iter()
            .map(|value| MidiMessage::control_change(self.channel, cc, value))
            .collect()
    }
}
