//! Serializable engine configuration.
//!
//! A host (configuration UI, preset loader) builds an [`EngineConfig`] and
//! hands it to [`ConductingEngineBuilder::from_config`](crate::ConductingEngineBuilder::from_config).
//! Persistence is left to the host.

use conductor_core::{Condition, Error as CoreError, HistoryBounds};
use conductor_midi_io::{
    ArpDirection, BuildMode, RateBucket, Waveform, DEFAULT_CC, DEFAULT_RAMP_THRESHOLD,
    DEFAULT_VELOCITY,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: f64,
    /// Start the play loop from `ingest` once any control is active.
    pub armed: bool,
    pub history: HistoryBounds,
    /// Rate used by controls without their own rate while no sensor reading
    /// has arrived.
    pub default_rate: RateBucket,
    pub arpeggiator: ArpeggiatorConfig,
    pub controls: Vec<ControlConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            armed: false,
            history: HistoryBounds::default(),
            default_rate: RateBucket::Whole,
            arpeggiator: ArpeggiatorConfig::default(),
            controls: Vec::new(),
        }
    }
}

/// Engine-wide arpeggio order and octave shift, used by arpeggiated controls
/// that leave their own unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggiatorConfig {
    pub direction: ArpDirection,
    pub octave: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    pub label: String,
    pub condition: Condition,
    pub behavior: Behavior,
}

impl ControlConfig {
    pub fn new(label: impl Into<String>, condition: Condition, behavior: Behavior) -> Self {
        Self {
            label: label.into(),
            condition,
            behavior,
        }
    }
}

fn default_cc() -> u8 {
    DEFAULT_CC
}

fn default_max() -> u8 {
    127
}

fn default_velocity() -> u8 {
    DEFAULT_VELOCITY
}

fn default_threshold() -> u8 {
    DEFAULT_RAMP_THRESHOLD
}

/// What a control plays while active.
///
/// `rate: None` follows the engine's default rate. An arpeggio's `direction`
/// and `octave` fall back to the engine arpeggiator's settings when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    Modulate {
        #[serde(default)]
        channel: u8,
        #[serde(default = "default_cc")]
        cc: u8,
        #[serde(default)]
        rate: Option<RateBucket>,
        #[serde(default)]
        waveform: Waveform,
        #[serde(default)]
        invert: bool,
        #[serde(default)]
        min: u8,
        #[serde(default = "default_max")]
        max: u8,
    },
    Arpeggiate {
        #[serde(default)]
        channel: u8,
        #[serde(default)]
        rate: Option<RateBucket>,
        #[serde(default = "default_velocity")]
        velocity: u8,
        #[serde(default)]
        direction: Option<ArpDirection>,
        #[serde(default)]
        octave: Option<i8>,
    },
    SensorRamp {
        #[serde(default)]
        channel: u8,
        #[serde(default = "default_cc")]
        cc: u8,
        #[serde(default)]
        rate: Option<RateBucket>,
        #[serde(default = "default_threshold")]
        threshold: u8,
    },
    Disabled,
}

impl Behavior {
    /// Full-range sine on the default CC.
    pub fn modulate(channel: u8, waveform: Waveform, rate: RateBucket) -> Self {
        Behavior::Modulate {
            channel,
            cc: DEFAULT_CC,
            rate: Some(rate),
            waveform,
            invert: false,
            min: 0,
            max: 127,
        }
    }

    pub fn arpeggiate(channel: u8, rate: RateBucket) -> Self {
        Behavior::Arpeggiate {
            channel,
            rate: Some(rate),
            velocity: DEFAULT_VELOCITY,
            direction: None,
            octave: None,
        }
    }

    pub fn sensor_ramp(channel: u8, cc: u8) -> Self {
        Behavior::SensorRamp {
            channel,
            cc,
            rate: None,
            threshold: DEFAULT_RAMP_THRESHOLD,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            Behavior::Modulate { channel, .. }
            | Behavior::Arpeggiate { channel, .. }
            | Behavior::SensorRamp { channel, .. } => channel,
            Behavior::Disabled => 0,
        }
    }

    pub fn rate(&self) -> Option<RateBucket> {
        match *self {
            Behavior::Modulate { rate, .. }
            | Behavior::Arpeggiate { rate, .. }
            | Behavior::SensorRamp { rate, .. } => rate,
            Behavior::Disabled => None,
        }
    }

    pub fn build_mode(&self) -> BuildMode {
        match *self {
            Behavior::Modulate {
                cc,
                waveform,
                invert,
                min,
                max,
                ..
            } => BuildMode::Modulate {
                cc,
                waveform,
                invert,
                min,
                max,
            },
            Behavior::Arpeggiate { velocity, .. } => BuildMode::Notes { velocity },
            Behavior::SensorRamp { cc, threshold, .. } => BuildMode::SensorRamp { cc, threshold },
            Behavior::Disabled => BuildMode::Disabled,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.channel() > 15 {
            return Err(CoreError::InvalidConfig(format!(
                "MIDI channel {} out of range 0-15",
                self.channel()
            )));
        }
        match *self {
            Behavior::Modulate { cc, min, max, .. } => {
                check_data_byte("cc", cc)?;
                check_data_byte("min", min)?;
                check_data_byte("max", max)?;
                if min > max {
                    return Err(CoreError::InvalidConfig(format!(
                        "modulation min ({min}) exceeds max ({max})"
                    )));
                }
                Ok(())
            }
            Behavior::Arpeggiate { velocity, .. } => check_data_byte("velocity", velocity),
            Behavior::SensorRamp { cc, .. } => check_data_byte("cc", cc),
            Behavior::Disabled => Ok(()),
        }
    }
}

fn check_data_byte(name: &str, value: u8) -> Result<(), CoreError> {
    if value > 127 {
        return Err(CoreError::InvalidConfig(format!(
            "{name} {value} out of MIDI data range 0-127"
        )));
    }
    Ok(())
}
