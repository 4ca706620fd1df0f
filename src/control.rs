//! A configured mapping from a gesture condition to a MIDI behavior.

use crate::config::{Behavior, ControlConfig};
use crate::Result;
use conductor_core::{Condition, Metronome};
use conductor_midi_io::{MidiEventBuilder, MidiMessage, RateBucket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What the play loop needs from one control for one tick.
#[derive(Debug, Clone)]
pub struct PlaybackSlot {
    pub label: Arc<str>,
    pub messages: Arc<[MidiMessage]>,
    pub time_slice: Duration,
    pub gate: bool,
}

#[derive(Debug, Clone)]
pub struct Control {
    label: Arc<str>,
    condition: Condition,
    behavior: Behavior,
    active: bool,
    // Set when `rendered` no longer reflects `active`/`behavior`
    update: bool,
    control_value: u8,
    builder: MidiEventBuilder,
    rendered: Arc<[MidiMessage]>,
    time_slice: Duration,
}

impl Control {
    pub fn new(config: ControlConfig) -> Result<Self> {
        config.condition.validate()?;
        config.behavior.validate()?;
        let active = config.condition.initial_state();
        Ok(Self {
            label: Arc::from(config.label),
            condition: config.condition,
            behavior: config.behavior,
            active,
            update: active,
            control_value: 0,
            builder: MidiEventBuilder::new(
                config.behavior.channel(),
                config.behavior.build_mode(),
            ),
            rendered: Arc::from(Vec::new()),
            time_slice: Duration::ZERO,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn needs_update(&self) -> bool {
        self.update
    }

    pub fn control_value(&self) -> u8 {
        self.control_value
    }

    pub fn rate(&self) -> RateBucket {
        self.builder.rate()
    }

    /// Last rendered sequence; empty while inactive.
    pub fn rendered(&self) -> &[MidiMessage] {
        &self.rendered
    }

    pub fn time_slice(&self) -> Duration {
        self.time_slice
    }

    /// Run the condition against `history`. Returns `true` on a state change.
    ///
    /// `IncompleteHistory` leaves the state untouched and is passed through.
    pub fn evaluate(&mut self, history: &[i32]) -> Result<bool> {
        let next = self.condition.evaluate(self.active, history)?;
        if next == self.active {
            return Ok(false);
        }
        self.active = next;
        self.update = true;
        info!(control = %self.label, active = next, "control toggled");
        Ok(true)
    }

    pub(crate) fn set_control_value(&mut self, value: u8) {
        self.control_value = value;
    }

    /// Replace the behavior. The new behavior is rendered on the next refresh.
    pub fn set_behavior(&mut self, behavior: Behavior) -> Result<()> {
        behavior.validate()?;
        let rate = self.builder.rate();
        self.builder = MidiEventBuilder::new(behavior.channel(), behavior.build_mode()).with_rate(rate);
        self.behavior = behavior;
        self.update = true;
        Ok(())
    }

    /// Arpeggios and sensor ramps are re-rendered on every tick, right
    /// before playback.
    pub fn renders_per_tick(&self) -> bool {
        matches!(
            self.behavior,
            Behavior::Arpeggiate { .. } | Behavior::SensorRamp { .. }
        )
    }

    /// Re-render if active or flagged, then recompute the time slice.
    ///
    /// `notes` is the arpeggiator snapshot for arpeggiated controls. Sensor
    /// ramps only take the reading here; the ramp itself is built by
    /// [`render_tick`](Self::render_tick) so every build gets played.
    pub(crate) fn refresh(
        &mut self,
        default_rate: RateBucket,
        notes: Option<Vec<u8>>,
        metronome: &Metronome,
    ) {
        let base = self.behavior.rate().unwrap_or(default_rate);
        self.builder
            .set_rate(RateBucket::from_control_value(self.control_value as i32, base));
        if let Some(notes) = notes {
            self.builder.set_notes(notes);
        }
        let ramp = matches!(self.behavior, Behavior::SensorRamp { .. });
        if ramp {
            self.builder.set_reading(self.control_value);
        }

        if self.active || self.update {
            self.rendered = match (self.active, ramp) {
                (false, _) => Arc::from(Vec::new()),
                // Stale after a toggle or behavior change; next tick rebuilds
                (true, true) if self.update => Arc::from(Vec::new()),
                (true, true) => Arc::clone(&self.rendered),
                (true, false) => Arc::from(self.builder.render()),
            };
            debug!(
                control = %self.label,
                rate = %self.builder.rate().symbol(),
                events = self.rendered.len(),
                "control refreshed"
            );
        }
        self.retime(metronome);
        self.update = false;
    }

    /// Rebuild a per-tick behavior just before it plays. Inactive controls
    /// and fixed behaviors are left alone.
    pub(crate) fn render_tick(&mut self, notes: Option<Vec<u8>>, metronome: &Metronome) {
        if !self.active || !self.renders_per_tick() {
            return;
        }
        if let Some(notes) = notes {
            self.builder.set_notes(notes);
        }
        self.rendered = Arc::from(self.builder.render());
        self.retime(metronome);
    }

    pub(crate) fn retime(&mut self, metronome: &Metronome) {
        self.time_slice = metronome.time_slice(self.rendered.len());
    }

    pub(crate) fn playback_slot(&self) -> PlaybackSlot {
        PlaybackSlot {
            label: Arc::clone(&self.label),
            messages: Arc::clone(&self.rendered),
            time_slice: self.time_slice,
            gate: self.active,
        }
    }
}
