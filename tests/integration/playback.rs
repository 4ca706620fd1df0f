//! Tick playback, the play loop, failure isolation and the arpeggiator path.

use crate::helpers::*;
use conductor::prelude::*;
use conductor::{virtual_input, Error};
use std::time::Duration;

#[test]
fn test_tick_plays_every_active_control() {
    let sink = Arc::new(RecordingSink::new());
    let engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [
            ControlConfig::new("a", always_on(), sine_quarter(0)),
            ControlConfig::new("b", always_on(), sine_quarter(1)),
        ],
    );

    let report = engine.tick().unwrap();
    assert_eq!(report.played, 200);
    assert!(report.failures.is_empty());
    assert_eq!(sink.len(), 200);
    assert_eq!(engine.ticks_played(), 1);

    // Per-channel order is preserved even though controls play concurrently
    let channel_1: Vec<MidiMessage> = sink
        .messages()
        .into_iter()
        .filter(|m| m.channel() == 1)
        .collect();
    assert_eq!(channel_1.as_slice(), engine.control("b").unwrap().rendered());
}

#[test]
fn test_failing_control_does_not_cancel_others() {
    init_tracing();
    let sink = Arc::new(ChannelFailingSink::new(1));
    let engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [
            ControlConfig::new("healthy", always_on(), sine_quarter(0)),
            ControlConfig::new("unplugged", always_on(), sine_quarter(1)),
        ],
    );

    let report = engine.tick().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].label, "unplugged");
    assert!(matches!(
        report.failures[0].error,
        conductor::midi::Error::SinkUnavailable(_)
    ));
    assert_eq!(report.played, 100);
    assert_eq!(sink.accepted.lock().len(), 100);
    assert!(sink.accepted.lock().iter().all(|m| m.channel() == 0));
}

#[test]
fn test_unavailable_sink_recovers() {
    let sink = Arc::new(RecordingSink::new());
    let engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [ControlConfig::new("a", always_on(), sine_quarter(0))],
    );

    sink.set_available(false);
    let report = engine.tick().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(sink.is_empty());

    sink.set_available(true);
    let report = engine.tick().unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(sink.len(), 100);
}

#[test]
fn test_play_loop_runs_until_stopped() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());
    let mut engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [ControlConfig::new("a", always_on(), sine_quarter(0))],
    );

    engine.start().unwrap();
    assert!(engine.is_playing());
    assert!(engine.metronome().is_running());
    // Second start is a no-op
    engine.start().unwrap();
    assert!(matches!(engine.tick(), Err(Error::PlaybackRunning)));

    assert!(wait_for(|| engine.ticks_played() >= 2));
    engine.stop();
    assert!(!engine.is_playing());
    assert!(!engine.metronome().is_running());

    let played = sink.len();
    assert!(played >= 200);
    assert_eq!(played % 100, 0);

    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(sink.len(), played);

    // Manual ticks work again once stopped
    assert_eq!(engine.tick().unwrap().played, 100);
}

#[test]
fn test_play_loop_follows_ingest() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [ControlConfig::new("swell", hold((1, 2), (0, 2)), sine_quarter(0))],
    );

    engine.start().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert!(sink.is_empty());

    ingest_all(&mut engine, &[1, 1]);
    assert!(wait_for(|| !sink.is_empty()));
    engine.stop();
}

fn ramp_engine(sink: Arc<RecordingSink>) -> ConductingEngine {
    engine_with(
        FAST_BPM,
        sink,
        [ControlConfig::new("ramp", always_on(), Behavior::sensor_ramp(0, 7))],
    )
}

fn played_values(sink: &RecordingSink) -> Vec<u8> {
    sink.messages().iter().map(|m| m.data2).collect()
}

#[test]
fn test_sensor_ramp_through_engine() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = ramp_engine(sink.clone());
    assert_eq!(engine.tick().unwrap().played, 0);

    assert!(engine.set_sensor_value(5));
    engine.ingest(0).unwrap();
    assert_eq!(engine.tick().unwrap().played, 6);
    assert_eq!(played_values(&sink), vec![0, 1, 2, 3, 4, 5]);

    // Unchanged reading: nothing to ramp
    sink.clear();
    engine.ingest(0).unwrap();
    assert_eq!(engine.tick().unwrap().played, 0);

    // Falling ramp runs downwards
    assert!(engine.set_sensor_value(2));
    engine.ingest(0).unwrap();
    engine.tick().unwrap();
    assert_eq!(played_values(&sink), vec![5, 4, 3, 2]);
}

#[test]
fn test_sensor_ramp_survives_repeated_ingest() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = ramp_engine(sink.clone());

    // Predictions arrive faster than beats
    assert!(engine.set_sensor_value(50));
    ingest_all(&mut engine, &[0, 0, 0]);

    let report = engine.tick().unwrap();
    assert_eq!(report.played, 51);
    assert_eq!(played_values(&sink), (0..=50).collect::<Vec<u8>>());

    // Played once, not again
    assert_eq!(engine.tick().unwrap().played, 0);
}

#[test]
fn test_play_loop_plays_sensor_ramp() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = ramp_engine(sink.clone());
    engine.start().unwrap();

    assert!(engine.set_sensor_value(20));
    ingest_all(&mut engine, &[0, 0]);
    assert!(wait_for(|| sink.len() >= 21));
    engine.stop();
    assert_eq!(played_values(&sink), (0..=20).collect::<Vec<u8>>());
}

#[test]
fn test_arpeggiator_feeds_arpeggiate_control() {
    let behavior = Behavior::Arpeggiate {
        channel: 0,
        rate: Some(RateBucket::Whole),
        velocity: 100,
        direction: Some(ArpDirection::Up),
        octave: Some(1),
    };
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("arp", always_on(), behavior)],
    );

    let (keys, input) = virtual_input(16);
    engine.start_arpeggiator(input).unwrap();
    keys.send(MidiMessage::note_on(0, 64, 90)).unwrap();
    keys.send(MidiMessage::note_on(0, 60, 90)).unwrap();
    assert!(wait_for(|| engine.arpeggiator().held_notes().len() == 2));

    engine.refresh();
    assert_eq!(
        engine.control("arp").unwrap().rendered(),
        &[
            MidiMessage::note_on(0, 72, 100),
            MidiMessage::note_off(0, 72, 0),
            MidiMessage::note_on(0, 76, 100),
            MidiMessage::note_off(0, 76, 0),
        ]
    );

    keys.send(MidiMessage::note_off(0, 60, 0)).unwrap();
    assert!(wait_for(|| engine.arpeggiator().held_notes() == vec![64]));
    engine.refresh();
    assert_eq!(engine.control("arp").unwrap().rendered().len(), 2);

    // Closing the input stops the arpeggiator thread
    drop(keys);
    assert!(wait_for(|| !engine.arpeggiator().is_running()));
}

#[test]
fn test_held_notes_reach_sink_without_ingest() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = engine_with(
        FAST_BPM,
        sink.clone(),
        [ControlConfig::new(
            "arp",
            always_on(),
            Behavior::arpeggiate(0, RateBucket::Whole),
        )],
    );
    let (keys, input) = virtual_input(16);
    engine.start_arpeggiator(input).unwrap();
    engine.start().unwrap();

    keys.send(MidiMessage::note_on(0, 67, 90)).unwrap();
    assert!(wait_for(|| sink
        .messages()
        .contains(&MidiMessage::note_on(0, 67, 64))));

    keys.send(MidiMessage::note_off(0, 67, 0)).unwrap();
    keys.send(MidiMessage::note_on(0, 69, 90)).unwrap();
    assert!(wait_for(|| sink
        .messages()
        .contains(&MidiMessage::note_on(0, 69, 64))));
    engine.stop();
}

#[test]
fn test_arpeggiate_follows_engine_arpeggiator_settings() {
    let mut engine = ConductingEngine::builder()
        .bpm(FAST_BPM)
        .arpeggiator(ArpDirection::Down, 1)
        .control(ControlConfig::new(
            "arp",
            always_on(),
            Behavior::arpeggiate(0, RateBucket::Whole),
        ))
        .build()
        .unwrap();

    let (keys, input) = virtual_input(16);
    engine.start_arpeggiator(input).unwrap();
    keys.send(MidiMessage::note_on(0, 60, 90)).unwrap();
    keys.send(MidiMessage::note_on(0, 64, 90)).unwrap();
    assert!(wait_for(|| engine.arpeggiator().held_notes().len() == 2));

    engine.refresh();
    let notes: Vec<u8> = engine
        .control("arp")
        .unwrap()
        .rendered()
        .iter()
        .filter(|m| m.is_note_on())
        .map(|m| m.data1)
        .collect();
    assert_eq!(notes, vec![76, 72]);

    // Changing the arpeggiator takes effect on the next refresh
    engine.arpeggiator().set_octave(0);
    engine.refresh();
    let notes: Vec<u8> = engine
        .control("arp")
        .unwrap()
        .rendered()
        .iter()
        .filter(|m| m.is_note_on())
        .map(|m| m.data1)
        .collect();
    assert_eq!(notes, vec![64, 60]);
}

#[test]
fn test_armed_engine_starts_playing_on_activation() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = ConductingEngine::builder()
        .bpm(FAST_BPM)
        .armed(true)
        .sink(sink.clone())
        .control(ControlConfig::new("swell", hold((1, 3), (0, 3)), sine_quarter(0)))
        .build()
        .unwrap();

    // Nothing active yet: stays idle
    ingest_all(&mut engine, &[1, 1]);
    assert!(!engine.is_playing());

    engine.ingest(1).unwrap();
    assert!(engine.is_playing());
    assert!(wait_for(|| sink.len() >= 100));

    // Further predictions keep the same loop
    engine.ingest(1).unwrap();
    assert!(engine.is_playing());
    engine.stop();
    assert!(!engine.is_playing());
}

#[test]
fn test_unarmed_engine_never_starts_from_ingest() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("pad", always_on(), sine_quarter(0))],
    );
    assert!(!engine.is_armed());
    ingest_all(&mut engine, &[0, 1, 2]);
    assert!(!engine.is_playing());

    engine.set_armed(true);
    engine.ingest(0).unwrap();
    assert!(engine.is_playing());

    engine.set_armed(false);
    assert!(engine.is_playing());
    engine.stop();
}
