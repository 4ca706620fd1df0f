//! Note-length buckets used to size modulation periods and note repeats.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBucket {
    #[default]
    Whole,
    Half,
    Triplet,
    Quarter,
    Eighth,
    Sixteenth,
}

impl RateBucket {
    /// Subdivisions per whole note.
    pub const fn multiplier(self) -> u32 {
        match self {
            RateBucket::Whole => 1,
            RateBucket::Half => 2,
            RateBucket::Triplet => 3,
            RateBucket::Quarter => 4,
            RateBucket::Eighth => 8,
            RateBucket::Sixteenth => 16,
        }
    }

    /// Bucket selected by a continuous control value (sensor reading).
    ///
    /// `0` means "no reading" and keeps `default`. Otherwise the intervals are
    /// half-open on the left: `[10, 20)` is an eighth, `[40, ..)` a whole note,
    /// and anything below 10 a sixteenth.
    pub fn from_control_value(value: i32, default: RateBucket) -> RateBucket {
        match value {
            0 => default,
            v if v < 10 => RateBucket::Sixteenth,
            v if v < 20 => RateBucket::Eighth,
            v if v < 30 => RateBucket::Quarter,
            v if v < 40 => RateBucket::Half,
            _ => RateBucket::Whole,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            RateBucket::Whole => 'w',
            RateBucket::Half => 'h',
            RateBucket::Triplet => 't',
            RateBucket::Quarter => 'q',
            RateBucket::Eighth => 'e',
            RateBucket::Sixteenth => 's',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<RateBucket> {
        match symbol {
            'w' => Some(RateBucket::Whole),
            'h' => Some(RateBucket::Half),
            't' => Some(RateBucket::Triplet),
            'q' => Some(RateBucket::Quarter),
            'e' => Some(RateBucket::Eighth),
            's' => Some(RateBucket::Sixteenth),
            _ => None,
        }
    }
}
