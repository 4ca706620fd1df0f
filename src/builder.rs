//! Builder for configuring and constructing a `ConductingEngine`.

use crate::config::{ArpeggiatorConfig, ControlConfig, EngineConfig, DEFAULT_BPM};
use crate::control::Control;
use crate::{ConductingEngine, Result};
use conductor_core::{Error as CoreError, HistoryBounds, Metronome, PredictionHistory};
use conductor_midi_io::{ArpDirection, Arpeggiator, MidiSink, NullSink, Player, RateBucket};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Everything is validated in [`build`](Self::build): tempo, history bounds,
/// condition thresholds, behavior ranges and label uniqueness.
///
/// Without a [`sink`](Self::sink) the engine plays into a [`NullSink`].
///
/// # Example
///
/// ```ignore
/// use conductor::prelude::*;
///
/// let output = Arc::new(MidiOutputSink::new()?);
/// output.connect_by_name("IAC")?;
///
/// let engine = ConductingEngine::builder()
///     .bpm(96.0)
///     .default_rate(RateBucket::Quarter)
///     .sink(output)
///     .control(ControlConfig::new(
///         "arp",
///         Condition::NoAction { active: true },
///         Behavior::arpeggiate(1, RateBucket::Eighth),
///     ))
///     .build()?;
/// ```
pub struct ConductingEngineBuilder {
    bpm: f64,
    armed: bool,
    history: HistoryBounds,
    default_rate: RateBucket,
    arpeggiator: ArpeggiatorConfig,
    controls: Vec<ControlConfig>,
    sink: Option<Arc<dyn MidiSink>>,
}

impl Default for ConductingEngineBuilder {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            armed: false,
            history: HistoryBounds::default(),
            default_rate: RateBucket::Whole,
            arpeggiator: ArpeggiatorConfig::default(),
            controls: Vec::new(),
            sink: None,
        }
    }
}

impl ConductingEngineBuilder {
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            bpm: config.bpm,
            armed: config.armed,
            history: config.history,
            default_rate: config.default_rate,
            arpeggiator: config.arpeggiator,
            controls: config.controls,
            sink: None,
        }
    }

    /// Default: 120
    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Start playback from `ingest` once any control is active. Default: off
    pub fn armed(mut self, armed: bool) -> Self {
        self.armed = armed;
        self
    }

    /// Default: capacity 1000, keep 100
    pub fn history(mut self, bounds: HistoryBounds) -> Self {
        self.history = bounds;
        self
    }

    /// Default: whole notes
    pub fn default_rate(mut self, rate: RateBucket) -> Self {
        self.default_rate = rate;
        self
    }

    pub fn arpeggiator(mut self, direction: ArpDirection, octave: i8) -> Self {
        self.arpeggiator = ArpeggiatorConfig { direction, octave };
        self
    }

    pub fn control(mut self, control: ControlConfig) -> Self {
        self.controls.push(control);
        self
    }

    pub fn controls(mut self, controls: impl IntoIterator<Item = ControlConfig>) -> Self {
        self.controls.extend(controls);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MidiSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<ConductingEngine> {
        let metronome = Metronome::new(self.bpm)?;
        let history = PredictionHistory::new(self.history)?;

        let mut labels = HashSet::new();
        let controls = self
            .controls
            .into_iter()
            .map(|config| {
                if !labels.insert(config.label.clone()) {
                    return Err(CoreError::InvalidConfig(format!(
                        "duplicate control label '{}'",
                        config.label
                    ))
                    .into());
                }
                Control::new(config)
            })
            .collect::<Result<Vec<_>>>()?;

        let sink = self.sink.unwrap_or_else(|| {
            debug!("no MIDI sink configured, output is discarded");
            Arc::new(NullSink)
        });

        let arpeggiator = Arpeggiator::new(self.arpeggiator.direction, self.arpeggiator.octave);

        debug!(
            bpm = self.bpm,
            controls = controls.len(),
            "conducting engine built"
        );
        Ok(ConductingEngine::from_parts(
            metronome,
            arpeggiator,
            Player::new(sink),
            history,
            controls,
            self.default_rate,
            self.armed,
        ))
    }
}
