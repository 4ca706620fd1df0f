//! Periodic modulation shapes sampled into control values.

use serde::{Deserialize, Serialize};

/// Sample points per whole-note period (one sample every 0.01 of a period).
pub const SAMPLES_PER_WHOLE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Value in `[-1, 1]` at `phase` cycles.
    pub fn sample(self, phase: f64) -> f64 {
        let frac = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (2.0 * std::f64::consts::PI * phase).sin(),
            Waveform::Sawtooth => 2.0 * frac - 1.0,
            Waveform::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// One period of the shape at `multiplier` subdivisions per whole note.
    ///
    /// Sample `i` sits at time `i / 100` of a whole note, so a period of
    /// `1 / multiplier` holds `ceil(100 / multiplier)` samples.
    pub fn period(self, multiplier: u32, invert: bool) -> Vec<f64> {
        let multiplier = multiplier.max(1);
        let sign = if invert { -1.0 } else { 1.0 };
        (0..samples_per_period(multiplier))
            .map(|i| {
                let phase = (multiplier * i as u32) as f64 / SAMPLES_PER_WHOLE as f64;
                sign * self.sample(phase)
            })
            .collect()
    }
}

pub fn samples_per_period(multiplier: u32) -> usize {
    let multiplier = multiplier.max(1);
    SAMPLES_PER_WHOLE.div_ceil(multiplier) as usize
}

/// Linear map from `[in_min, in_max]` to `[out_min, out_max]`, rounded to the
/// nearest integer with ties to even.
#[inline]
pub fn convert_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let scaled = (value - in_min) / (in_max - in_min);
    (out_min + scaled * (out_max - out_min)).round_ties_even()
}

/// Bipolar sample to a controller value in `[min, max]`.
///
/// Goes through the full 0-127 range first and rounds at both stages, so
/// values match a two-step rescale exactly.
pub fn to_controller_value(sample: f64, min: u8, max: u8) -> u8 {
    let full = convert_range(sample, -1.0, 1.0, 0.0, 127.0);
    let ranged = convert_range(full, 0.0, 127.0, min as f64, max as f64);
    ranged.clamp(0.0, 127.0) as u8
}
