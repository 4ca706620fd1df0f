//! ConductingEngine that turns gesture predictions into beat-synchronized MIDI.

use crate::config::Behavior;
use crate::control::{Control, PlaybackSlot};
use crate::{ConductingEngineBuilder, Error, Result};
use conductor_core::{Metronome, PredictionHistory};
use conductor_midi_io::{Arpeggiator, Error as MidiError, MidiInputSource, Player, RateBucket};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lowest and highest sensor readings treated as valid.
pub const SENSOR_RANGE: std::ops::RangeInclusive<i32> = 1..=127;

/// A control that changed state during [`ConductingEngine::ingest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub transitions: Vec<Transition>,
    /// Controls whose condition could not be decided yet (history too short).
    pub deferred: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFailure {
    pub label: String,
    pub error: MidiError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Messages delivered across all controls.
    pub played: usize,
    pub failures: Vec<PlaybackFailure>,
}

struct PlayLoop {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

/// Orchestrates prediction history, controls, arpeggiator and playback.
///
/// Ingest, evaluation and rendering run synchronously on the caller's thread.
/// Playback runs either on the play-loop thread ([`start`](Self::start)) or
/// one tick at a time ([`tick`](Self::tick)). Each tick first rebuilds the
/// arpeggios and sensor ramps, so held notes and ramps reach the sink even
/// while no predictions arrive.
///
/// An [`armed`](Self::set_armed) engine starts the play loop from
/// [`ingest`](Self::ingest) as soon as any control is active.
///
/// # Example
///
/// ```ignore
/// use conductor::prelude::*;
///
/// let mut engine = ConductingEngine::builder()
///     .bpm(120.0)
///     .control(ControlConfig::new(
///         "swell",
///         Condition::hold(GestureHold::new(1, 3), GestureHold::new(0, 3)),
///         Behavior::modulate(0, Waveform::Sine, RateBucket::Quarter),
///     ))
///     .build()?;
///
/// engine.start()?;
/// for label in classifier {
///     engine.ingest(label)?;
/// }
/// ```
pub struct ConductingEngine {
    metronome: Arc<Metronome>,
    arpeggiator: Arc<Arpeggiator>,
    player: Player,
    history: PredictionHistory,
    controls: Arc<Mutex<Vec<Control>>>,
    default_rate: RateBucket,
    sensor_value: u8,
    armed: bool,
    ticks: Arc<AtomicU64>,
    play_loop: Option<PlayLoop>,
}

impl ConductingEngine {
    pub fn builder() -> ConductingEngineBuilder {
        ConductingEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        metronome: Metronome,
        arpeggiator: Arpeggiator,
        player: Player,
        history: PredictionHistory,
        controls: Vec<Control>,
        default_rate: RateBucket,
        armed: bool,
    ) -> Self {
        let mut engine = Self {
            metronome: Arc::new(metronome),
            arpeggiator: Arc::new(arpeggiator),
            player,
            history,
            controls: Arc::new(Mutex::new(controls)),
            default_rate,
            sensor_value: 0,
            armed,
            ticks: Arc::new(AtomicU64::new(0)),
            play_loop: None,
        };
        engine.refresh();
        engine
    }

    /// Record one prediction and re-evaluate every control.
    ///
    /// When armed, starts the play loop once any control is active.
    pub fn ingest(&mut self, prediction: i32) -> Result<IngestReport> {
        if self.history.push(prediction) {
            debug!(kept = self.history.len(), "prediction history truncated");
        }

        let mut report = IngestReport::default();
        let any_active = {
            let mut controls = self.controls.lock();
            for control in controls.iter_mut() {
                control.set_control_value(self.sensor_value);
                match control.evaluate(self.history.as_slice()) {
                    Ok(true) => report.transitions.push(Transition {
                        label: control.label().to_string(),
                        active: control.is_active(),
                    }),
                    Ok(false) => {}
                    Err(Error::Core(e)) if e.is_incomplete() => report.deferred += 1,
                    Err(e) => return Err(e),
                }
            }
            refresh_controls(
                &mut controls,
                self.default_rate,
                &self.arpeggiator,
                &self.metronome,
            );
            controls.iter().any(Control::is_active)
        };

        if self.armed && any_active && !self.is_playing() {
            self.start()?;
        }
        Ok(report)
    }

    /// Re-render controls for the next tick.
    pub fn refresh(&mut self) {
        refresh_controls(
            &mut self.controls.lock(),
            self.default_rate,
            &self.arpeggiator,
            &self.metronome,
        );
    }

    /// Arm or disarm auto-start from [`ingest`](Self::ingest). Disarming
    /// leaves a running play loop alone; call [`stop`](Self::stop) for that.
    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feed a sensor reading. Only `1..=127` is accepted; returns whether the
    /// reading was taken. Applied to controls on the next ingest.
    pub fn set_sensor_value(&mut self, value: i32) -> bool {
        if !SENSOR_RANGE.contains(&value) {
            debug!(value, "ignoring out-of-range sensor reading");
            return false;
        }
        self.sensor_value = value as u8;
        true
    }

    pub fn sensor_value(&self) -> u8 {
        self.sensor_value
    }

    /// Change tempo; time slices follow immediately.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.metronome.set_bpm(bpm)?;
        for control in self.controls.lock().iter_mut() {
            control.retime(&self.metronome);
        }
        Ok(())
    }

    /// Takes effect on the next refresh.
    pub fn set_default_rate(&mut self, rate: RateBucket) {
        self.default_rate = rate;
    }

    pub fn default_rate(&self) -> RateBucket {
        self.default_rate
    }

    pub fn set_behavior(&mut self, label: &str, behavior: Behavior) -> Result<()> {
        {
            let mut controls = self.controls.lock();
            let control = controls
                .iter_mut()
                .find(|c| c.label() == label)
                .ok_or_else(|| Error::UnknownControl(label.to_string()))?;
            control.set_behavior(behavior)?;
        }
        self.refresh();
        Ok(())
    }

    /// Start the beat clock and the play loop. No-op if already playing.
    pub fn start(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        self.reap_play_loop();

        let (stop, stopped) = bounded::<()>(1);
        let metronome = Arc::clone(&self.metronome);
        let arpeggiator = Arc::clone(&self.arpeggiator);
        let controls = Arc::clone(&self.controls);
        let ticks = Arc::clone(&self.ticks);
        let player = self.player.clone();

        metronome.start();
        let thread = thread::Builder::new()
            .name("conductor-play-loop".to_string())
            .spawn(move || {
                while metronome.is_running() {
                    let started = Instant::now();
                    let slots = prepare_tick(&controls, &arpeggiator, &metronome);
                    play_tick(&slots, &player);
                    ticks.fetch_add(1, Ordering::Relaxed);

                    let remaining = metronome.beat_duration().saturating_sub(started.elapsed());
                    match stopped.recv_timeout(remaining) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("play loop exited");
            })
            .map_err(|e| {
                self.metronome.stop();
                MidiError::SinkUnavailable(format!("failed to spawn play loop: {e}"))
            })?;

        self.play_loop = Some(PlayLoop { stop, thread });
        info!(bpm = self.metronome.bpm(), "playback started");
        Ok(())
    }

    /// Stop the clock and wait for the current tick to finish.
    pub fn stop(&mut self) {
        self.metronome.stop();
        if let Some(play_loop) = self.play_loop.take() {
            let _ = play_loop.stop.try_send(());
            let _ = play_loop.thread.join();
            info!(ticks = self.ticks_played(), "playback stopped");
        }
    }

    fn reap_play_loop(&mut self) {
        if let Some(play_loop) = self.play_loop.take() {
            let _ = play_loop.thread.join();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.play_loop
            .as_ref()
            .is_some_and(|play_loop| !play_loop.thread.is_finished())
    }

    /// Run one tick synchronously.
    pub fn tick(&self) -> Result<TickReport> {
        if self.is_playing() {
            return Err(Error::PlaybackRunning);
        }
        let slots = prepare_tick(&self.controls, &self.arpeggiator, &self.metronome);
        let report = play_tick(&slots, &self.player);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(report)
    }

    pub fn ticks_played(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Snapshot of every control.
    pub fn controls(&self) -> Vec<Control> {
        self.controls.lock().clone()
    }

    /// Snapshot of one control.
    pub fn control(&self, label: &str) -> Option<Control> {
        self.controls
            .lock()
            .iter()
            .find(|c| c.label() == label)
            .cloned()
    }

    pub fn history(&self) -> &PredictionHistory {
        &self.history
    }

    pub fn metronome(&self) -> &Arc<Metronome> {
        &self.metronome
    }

    pub fn arpeggiator(&self) -> &Arc<Arpeggiator> {
        &self.arpeggiator
    }

    /// Start polling `source` for held notes.
    pub fn start_arpeggiator<S>(&self, source: S) -> Result<()>
    where
        S: MidiInputSource + 'static,
    {
        self.arpeggiator.start(source)?;
        Ok(())
    }

    /// Current playback slots. Arpeggios and ramps show their last build;
    /// the next tick rebuilds them.
    pub fn plan(&self) -> Vec<PlaybackSlot> {
        self.controls
            .lock()
            .iter()
            .map(Control::playback_slot)
            .collect()
    }
}

impl Drop for ConductingEngine {
    fn drop(&mut self) {
        self.stop();
        self.arpeggiator.stop();
    }
}

/// Arpeggiator snapshot for an arpeggiated behavior, with the control's own
/// order and octave or the arpeggiator's when unset.
fn arpeggio_notes(behavior: &Behavior, arpeggiator: &Arpeggiator) -> Option<Vec<u8>> {
    match *behavior {
        Behavior::Arpeggiate {
            direction, octave, ..
        } => Some(arpeggiator.notes_with(
            direction.unwrap_or_else(|| arpeggiator.direction()),
            octave.unwrap_or_else(|| arpeggiator.octave()),
        )),
        _ => None,
    }
}

fn refresh_controls(
    controls: &mut [Control],
    default_rate: RateBucket,
    arpeggiator: &Arpeggiator,
    metronome: &Metronome,
) {
    for control in controls {
        let notes = arpeggio_notes(control.behavior(), arpeggiator);
        control.refresh(default_rate, notes, metronome);
    }
}

/// Rebuild per-tick behaviors and snapshot what this tick plays. The lock is
/// released before any message is sent.
fn prepare_tick(
    controls: &Mutex<Vec<Control>>,
    arpeggiator: &Arpeggiator,
    metronome: &Metronome,
) -> Vec<PlaybackSlot> {
    let mut controls = controls.lock();
    controls
        .iter_mut()
        .map(|control| {
            if control.renders_per_tick() {
                let notes = arpeggio_notes(control.behavior(), arpeggiator);
                control.render_tick(notes, metronome);
            }
            control.playback_slot()
        })
        .collect()
}

/// One beat: a scoped playback thread per gated, non-empty slot, all joined
/// before returning. A failing control never cancels the others.
fn play_tick(slots: &[PlaybackSlot], player: &Player) -> TickReport {
    let mut report = TickReport::default();
    thread::scope(|scope| {
        let handles: Vec<_> = slots
            .iter()
            .filter(|slot| slot.gate && !slot.messages.is_empty())
            .map(|slot| {
                let handle = scope
                    .spawn(move || player.play(&slot.messages, slot.time_slice, slot.gate));
                (slot, handle)
            })
            .collect();

        for (slot, handle) in handles {
            let result = handle.join().unwrap_or_else(|_| {
                Err(MidiError::SinkUnavailable("playback thread panicked".to_string()))
            });
            match result {
                Ok(count) => report.played += count,
                Err(error) => {
                    warn!(control = %slot.label, "playback failed: {error}");
                    report.failures.push(PlaybackFailure {
                        label: slot.label.to_string(),
                        error,
                    });
                }
            }
        }
    });
    debug!(played = report.played, failed = report.failures.len(), "tick");
    report
}
