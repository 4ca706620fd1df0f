//! Engine build, configuration and setter tests.

use crate::helpers::*;
use approx::assert_relative_eq;
use conductor::prelude::*;
use conductor::{Error, SENSOR_RANGE};
use proptest::prelude::*;

#[test]
fn test_build_from_json_config() {
    let json = r#"{
        "bpm": 100.0,
        "default_rate": "eighth",
        "arpeggiator": { "direction": "down", "octave": -1 },
        "controls": [
            {
                "label": "swell",
                "condition": {
                    "kind": "hold",
                    "on": { "gesture": 1, "threshold": 3 },
                    "off": { "gesture": 0, "threshold": 3 }
                },
                "behavior": { "kind": "modulate", "channel": 2, "rate": "quarter" }
            },
            {
                "label": "arp",
                "condition": { "kind": "no_action", "active": true },
                "behavior": { "kind": "arpeggiate", "octave": 1 }
            }
        ]
    }"#;
    let config: EngineConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.history, HistoryBounds::default());

    let engine = ConductingEngineBuilder::from_config(config.clone()).build().unwrap();
    assert_eq!(engine.metronome().bpm(), 100.0);
    assert_eq!(engine.default_rate(), RateBucket::Eighth);
    assert_eq!(engine.arpeggiator().direction(), ArpDirection::Down);
    assert_eq!(engine.arpeggiator().octave(), -1);
    assert_eq!(engine.controls().len(), 2);
    assert!(!engine.control("swell").unwrap().is_active());
    assert!(engine.control("arp").unwrap().is_active());

    let json = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_history_truncation_through_ingest() {
    let mut engine = ConductingEngine::builder()
        .history(HistoryBounds::new(10, 4).unwrap())
        .build()
        .unwrap();

    for label in 0..11 {
        engine.ingest(label).unwrap();
    }
    assert_eq!(engine.history().as_slice(), &[7, 8, 9, 10]);
    assert_eq!(engine.history().total_ingested(), 11);
}

#[test]
fn test_sensor_value_range() {
    let mut engine = ConductingEngine::builder().build().unwrap();
    assert!(!engine.set_sensor_value(0));
    assert!(!engine.set_sensor_value(128));
    assert!(!engine.set_sensor_value(-5));
    assert_eq!(engine.sensor_value(), 0);

    assert!(engine.set_sensor_value(*SENSOR_RANGE.start()));
    assert!(engine.set_sensor_value(*SENSOR_RANGE.end()));
    assert_eq!(engine.sensor_value(), 127);
}

#[test]
fn test_sensor_value_drives_rate() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("pad", always_on(), sine_quarter(0))],
    );
    assert_eq!(engine.control("pad").unwrap().rate(), RateBucket::Quarter);
    assert_eq!(engine.control("pad").unwrap().rendered().len(), 100);

    engine.set_sensor_value(5);
    engine.ingest(0).unwrap();
    let pad = engine.control("pad").unwrap();
    assert_eq!(pad.control_value(), 5);
    assert_eq!(pad.rate(), RateBucket::Sixteenth);
    assert_eq!(pad.rendered().len(), 16 * 7);

    engine.set_sensor_value(45);
    engine.ingest(0).unwrap();
    let pad = engine.control("pad").unwrap();
    assert_eq!(pad.rate(), RateBucket::Whole);
    assert_eq!(pad.rendered().len(), 100);
}

#[test]
fn test_default_rate_applies_to_controls_without_rate() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new(
            "ramp",
            always_on(),
            Behavior::Modulate {
                channel: 0,
                cc: 1,
                rate: None,
                waveform: Waveform::Square,
                invert: false,
                min: 0,
                max: 127,
            },
        )],
    );
    assert_eq!(engine.control("ramp").unwrap().rate(), RateBucket::Whole);

    engine.set_default_rate(RateBucket::Half);
    engine.refresh();
    assert_eq!(engine.control("ramp").unwrap().rate(), RateBucket::Half);
    assert_eq!(engine.control("ramp").unwrap().rendered().len(), 100);
}

#[test]
fn test_set_bpm_retimes_plan() {
    let mut engine = engine_with(
        120.0,
        Arc::new(NullSink),
        [ControlConfig::new("pad", always_on(), sine_quarter(0))],
    );
    let before = engine.plan()[0].time_slice;

    engine.set_bpm(240.0).unwrap();
    let after = engine.plan()[0].time_slice;
    assert_eq!(after, engine.metronome().time_slice(100));
    assert!(after < before);
    // 100 events span one 250 ms beat
    assert_relative_eq!(after.as_secs_f64() * 99.0, 0.25, epsilon = 1e-6);

    assert!(matches!(
        engine.set_bpm(0.0),
        Err(Error::Core(conductor::core::Error::InvalidTempo(_)))
    ));
    assert_eq!(engine.metronome().bpm(), 240.0);
}

#[test]
fn test_set_behavior() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("pad", always_on(), sine_quarter(0))],
    );

    let err = engine.set_behavior("missing", Behavior::Disabled).unwrap_err();
    assert_eq!(err, Error::UnknownControl("missing".to_string()));

    engine.set_behavior("pad", Behavior::Disabled).unwrap();
    let pad = engine.control("pad").unwrap();
    assert_eq!(*pad.behavior(), Behavior::Disabled);
    assert!(pad.rendered().is_empty());
    assert!(pad.is_active());

    engine
        .set_behavior("pad", Behavior::sensor_ramp(3, 74))
        .unwrap();
    assert!(engine.control("pad").unwrap().rendered().is_empty());
}

proptest! {
    #[test]
    fn history_never_exceeds_capacity(
        labels in prop::collection::vec(0i32..4, 0..200),
        keep in 1usize..10,
    ) {
        let capacity = keep + 20;
        let mut engine = ConductingEngine::builder()
            .history(HistoryBounds::new(capacity, keep).unwrap())
            .control(ControlConfig::new("swell", hold((1, 3), (0, 3)), sine_quarter(0)))
            .build()
            .unwrap();

        for &label in &labels {
            engine.ingest(label).unwrap();
        }

        let history = engine.history().as_slice();
        prop_assert!(history.len() <= capacity);
        prop_assert!(labels.ends_with(history));
        prop_assert_eq!(engine.history().total_ingested(), labels.len() as u64);

        let swell = engine.control("swell").unwrap();
        if !swell.is_active() {
            prop_assert!(swell.rendered().is_empty());
        }
    }
}
