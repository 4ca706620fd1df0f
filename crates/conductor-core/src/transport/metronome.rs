use crate::lockfree::{AtomicDouble, AtomicFlag};
use crate::{Error, Result};
use std::time::Duration;

/// Beat clock shared by the play loop and every player.
///
/// Tempo and the running flag live in atomics so readers on playback threads
/// never block the ingest path.
#[derive(Debug)]
pub struct Metronome {
    bpm: AtomicDouble,
    running: AtomicFlag,
}

impl Metronome {
    pub fn new(bpm: f64) -> Result<Self> {
        validate_bpm(bpm)?;
        Ok(Self {
            bpm: AtomicDouble::new(bpm),
            running: AtomicFlag::new(false),
        })
    }

    pub fn set_bpm(&self, bpm: f64) -> Result<()> {
        validate_bpm(bpm)?;
        self.bpm.set(bpm);
        Ok(())
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.get()
    }

    /// Milliseconds per beat: `60000 / bpm`.
    #[inline]
    pub fn beat_duration_ms(&self) -> f64 {
        60_000.0 / self.bpm.get()
    }

    pub fn beat_duration(&self) -> Duration {
        Duration::from_secs_f64(self.beat_duration_ms() / 1000.0)
    }

    /// Spacing between consecutive events when `event_count` events share one beat.
    ///
    /// Multi-event sequences divide by `count - 1` ("now to next" spacing), so
    /// the last event lands on the next beat boundary. Zero or one event gets
    /// the whole beat.
    pub fn time_slice_ms(&self, event_count: usize) -> f64 {
        let beat = self.beat_duration_ms();
        if event_count > 1 {
            beat / (event_count - 1) as f64
        } else {
            beat
        }
    }

    pub fn time_slice(&self, event_count: usize) -> Duration {
        Duration::from_secs_f64(self.time_slice_ms(event_count) / 1000.0)
    }

    /// Length of one note at the given subdivision (1 = whole note = 4 beats).
    pub fn note_duration_ms(&self, subdivision: u32) -> f64 {
        if subdivision == 0 {
            return 0.0;
        }
        4.0 * self.beat_duration_ms() / subdivision as f64
    }

    pub fn start(&self) {
        if !self.running.swap(true) {
            tracing::info!("Metronome started at {:.1} BPM", self.bpm());
        }
    }

    pub fn stop(&self) {
        if self.running.swap(false) {
            tracing::info!("Metronome stopped");
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

fn validate_bpm(bpm: f64) -> Result<()> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidTempo(bpm))
    }
}
