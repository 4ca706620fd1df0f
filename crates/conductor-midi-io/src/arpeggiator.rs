//! Held-note tracking for arpeggiated controls.
//!
//! A polling thread owns the input source and publishes the set of held notes
//! through `ArcSwap`; readers take snapshots without locking.

use crate::error::{Error, Result};
use crate::event::MidiMessage;
use crate::source::MidiInputSource;
use arc_swap::ArcSwap;
use conductor_core::AtomicFlag;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI8, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const IDLE_POLL: Duration = Duration::from_millis(1);

/// Octave shifts outside this range are ignored.
pub const MAX_OCTAVE_SHIFT: i8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ArpDirection {
    #[default]
    Up = 0,
    Down = 1,
    Random = 2,
}

impl From<u8> for ArpDirection {
    fn from(value: u8) -> Self {
        match value {
            1 => ArpDirection::Down,
            2 => ArpDirection::Random,
            _ => ArpDirection::Up,
        }
    }
}

/// Apply one input message to a held-note set. Returns whether the set changed.
pub fn apply_message(held: &mut BTreeSet<u8>, message: &MidiMessage) -> bool {
    if message.is_note_on() {
        held.insert(message.data1)
    } else if message.is_note_off() {
        held.remove(&message.data1)
    } else {
        false
    }
}

/// Shift every note by `octave` octaves.
///
/// Out-of-range shifts leave the notes as they are; notes pushed outside
/// 0..=127 are dropped.
pub fn shift_octave(notes: &[u8], octave: i8) -> Vec<u8> {
    if !(-MAX_OCTAVE_SHIFT..=MAX_OCTAVE_SHIFT).contains(&octave) {
        return notes.to_vec();
    }
    let offset = 12 * octave as i16;
    notes
        .iter()
        .filter_map(|&note| u8::try_from(note as i16 + offset).ok())
        .filter(|&note| note <= 127)
        .collect()
}

pub struct Arpeggiator {
    held: Arc<ArcSwap<BTreeSet<u8>>>,
    direction: AtomicU8,
    octave: AtomicI8,
    running: Arc<AtomicFlag>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Arpeggiator {
    pub fn new(direction: ArpDirection, octave: i8) -> Self {
        Self {
            held: Arc::new(ArcSwap::from_pointee(BTreeSet::new())),
            direction: AtomicU8::new(direction as u8),
            octave: AtomicI8::new(octave),
            running: Arc::new(AtomicFlag::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Spawn the polling thread that owns `source`.
    ///
    /// No-op if already running; the source is dropped in that case.
    pub fn start<S>(&self, source: S) -> Result<()>
    where
        S: MidiInputSource + 'static,
    {
        let mut slot = self.thread.lock();
        if self.running.get() {
            debug!("Arpeggiator already running");
            return Ok(());
        }
        // Reap a thread that exited on its own (closed port)
        if let Some(finished) = slot.take() {
            let _ = finished.join();
        }

        self.running.set(true);
        let held = Arc::clone(&self.held);
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("arpeggiator-input".to_string())
            .spawn(move || Self::poll_loop(source, held, running))
            .map_err(|e| {
                self.running.set(false);
                Error::MidiDevice(format!("failed to spawn arpeggiator thread: {e}"))
            })?;
        *slot = Some(handle);
        info!("Arpeggiator started");
        Ok(())
    }

    fn poll_loop<S: MidiInputSource>(
        mut source: S,
        held: Arc<ArcSwap<BTreeSet<u8>>>,
        running: Arc<AtomicFlag>,
    ) {
        while running.get() {
            match source.poll() {
                Ok(Some(message)) => {
                    let mut next = BTreeSet::clone(&held.load());
                    if apply_message(&mut next, &message) {
                        debug!(held = ?next, "held notes changed");
                        held.store(Arc::new(next));
                    }
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(Error::PortClosed(port)) => {
                    warn!("Arpeggiator input closed: {port}");
                    break;
                }
                Err(e) => {
                    warn!("Arpeggiator input error: {e}");
                    thread::sleep(IDLE_POLL);
                }
            }
        }
        running.set(false);
        drop(source);
    }

    /// Stop polling and release the input. Idempotent.
    pub fn stop(&self) {
        self.running.set(false);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
            info!("Arpeggiator stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Held notes in ascending order.
    pub fn held_notes(&self) -> Vec<u8> {
        self.held.load().iter().copied().collect()
    }

    pub fn direction(&self) -> ArpDirection {
        ArpDirection::from(self.direction.load(Ordering::Relaxed))
    }

    pub fn set_direction(&self, direction: ArpDirection) {
        self.direction.store(direction as u8, Ordering::Relaxed);
    }

    pub fn octave(&self) -> i8 {
        self.octave.load(Ordering::Relaxed)
    }

    pub fn set_octave(&self, octave: i8) {
        self.octave.store(octave, Ordering::Relaxed);
    }

    /// Snapshot ordered and shifted with the configured direction and octave.
    pub fn current_notes(&self) -> Vec<u8> {
        self.notes_with(self.direction(), self.octave())
    }

    pub fn notes_with(&self, direction: ArpDirection, octave: i8) -> Vec<u8> {
        let mut notes = self.held_notes();
        match direction {
            ArpDirection::Up => {}
            ArpDirection::Down => notes.reverse(),
            ArpDirection::Random => notes.shuffle(&mut rand::thread_rng()),
        }
        shift_octave(&notes, octave)
    }
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new(ArpDirection::Up, 0)
    }
}

impl Drop for Arpeggiator {
    fn drop(&mut self) {
        self.stop();
    }
}
