//! Gesture conditions driven through `ConductingEngine::ingest`.

use crate::helpers::*;
use conductor::prelude::*;
use conductor::Transition;

/// BPM 120, Hold(on=(1,3), off=(0,3)), full-range quarter-note sine.
#[test]
fn test_hold_activates_and_deactivates() {
    let sink = Arc::new(RecordingSink::new());
    let mut engine = engine_with(
        120.0,
        sink.clone(),
        [ControlConfig::new("swell", hold((1, 3), (0, 3)), sine_quarter(0))],
    );

    let reports = ingest_all(&mut engine, &[1, 1]);
    assert!(reports.iter().all(|r| r.deferred == 1 && r.transitions.is_empty()));
    assert!(engine.control("swell").unwrap().rendered().is_empty());

    let report = engine.ingest(1).unwrap();
    assert_eq!(
        report.transitions,
        vec![Transition {
            label: "swell".to_string(),
            active: true
        }]
    );
    let swell = engine.control("swell").unwrap();
    assert!(swell.is_active());
    assert!(!swell.needs_update());
    assert_eq!(swell.rendered().len(), 4 * 25);
    assert!(swell
        .rendered()
        .iter()
        .all(|m| m.is_control_change() && m.data1 == 75 && m.data2 <= 127));
    assert_eq!(swell.time_slice(), engine.metronome().time_slice(100));

    let reports = ingest_all(&mut engine, &[0, 0, 0]);
    assert!(reports[0].transitions.is_empty());
    assert!(reports[1].transitions.is_empty());
    assert_eq!(reports[2].transitions.len(), 1);
    assert!(!reports[2].transitions[0].active);

    let swell = engine.control("swell").unwrap();
    assert!(!swell.is_active());
    assert!(swell.rendered().is_empty());

    // Nothing gated on: the tick sends nothing
    let tick = engine.tick().unwrap();
    assert_eq!(tick.played, 0);
    assert!(sink.is_empty());
}

#[test]
fn test_noise_budget_through_ingest() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("long", hold((2, 20), (0, 20)), sine_quarter(0))],
    );

    // Budget for 20 is 2: one stray label passes
    let mut labels = vec![2; 19];
    labels.insert(10, 5);
    let reports = ingest_all(&mut engine, &labels);
    assert_eq!(reports.last().unwrap().transitions.len(), 1);
    assert!(engine.control("long").unwrap().is_active());
}

#[test]
fn test_noise_budget_exceeded_keeps_inactive() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new("long", hold((2, 20), (0, 20)), sine_quarter(0))],
    );

    // Two stray labels in a window of 20 fail
    let mut labels = vec![2; 18];
    labels.insert(5, 7);
    labels.insert(15, 7);
    let reports = ingest_all(&mut engine, &labels);
    assert!(reports.iter().all(|r| r.transitions.is_empty()));
    assert!(!engine.control("long").unwrap().is_active());
}

#[test]
fn test_transition_condition() {
    let on = GestureTransition::new(GestureHold::new(1, 2), GestureHold::new(2, 2));
    let off = GestureTransition::new(GestureHold::new(2, 2), GestureHold::new(0, 2));
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [ControlConfig::new(
            "sweep",
            Condition::transition(on, off),
            sine_quarter(0),
        )],
    );

    // Second gesture first does not count
    ingest_all(&mut engine, &[2, 2, 1, 1]);
    assert!(!engine.control("sweep").unwrap().is_active());

    ingest_all(&mut engine, &[2, 2]);
    assert!(engine.control("sweep").unwrap().is_active());

    ingest_all(&mut engine, &[0, 0]);
    assert!(!engine.control("sweep").unwrap().is_active());
}

#[test]
fn test_deferred_counts_per_control() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [
            ControlConfig::new("short", hold((1, 2), (0, 2)), sine_quarter(0)),
            ControlConfig::new("long", hold((1, 4), (0, 4)), sine_quarter(1)),
            ControlConfig::new("fixed", always_on(), Behavior::Disabled),
        ],
    );

    let reports = ingest_all(&mut engine, &[1, 1, 1, 1]);
    let deferred: Vec<usize> = reports.iter().map(|r| r.deferred).collect();
    assert_eq!(deferred, vec![2, 1, 1, 0]);
    assert!(engine.control("short").unwrap().is_active());
    assert!(engine.control("long").unwrap().is_active());
}

#[test]
fn test_no_action_never_transitions() {
    let mut engine = engine_with(
        FAST_BPM,
        Arc::new(NullSink),
        [
            ControlConfig::new("on", always_on(), sine_quarter(0)),
            ControlConfig::new(
                "off",
                Condition::NoAction { active: false },
                sine_quarter(1),
            ),
        ],
    );

    let reports = ingest_all(&mut engine, &[0, 1, 2, 3, 1, 1, 1, 0, 0, 0]);
    assert!(reports.iter().all(|r| r.transitions.is_empty() && r.deferred == 0));
    assert!(engine.control("on").unwrap().is_active());
    assert!(!engine.control("off").unwrap().is_active());
    assert!(engine.control("off").unwrap().rendered().is_empty());
}
