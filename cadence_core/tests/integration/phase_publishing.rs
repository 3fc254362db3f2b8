//! Integration test: operating phase throttling through the cycle driver.

use cadence_common::config::CycleConfig;
use cadence_common::payload::Payload;
use cadence_common::phase::{ModeSignals, OperatingPhase};
use cadence_common::topic::Topic;
use cadence_core::cycle::CycleDriver;
use cadence_core::hub::StateChangeHub;

use super::common::Recorder;

fn phases(recorder: &Recorder) -> Vec<OperatingPhase> {
    recorder
        .on(Topic::GamePhase)
        .iter()
        .filter_map(|p| p.get::<i32>().and_then(OperatingPhase::from_i32))
        .collect()
}

#[test]
fn stable_phase_is_published_once() {
    let mut hub = StateChangeHub::new();
    let recorder = Recorder::shared();
    hub.register_for_state_changes(&recorder, Topic::GamePhase).unwrap();
    let mut driver = CycleDriver::new(hub, CycleConfig::default());

    for _ in 0..50 {
        driver.step(ModeSignals::MANUAL_ENABLED).unwrap();
    }
    assert_eq!(phases(&recorder.borrow()), [OperatingPhase::ManualOperation]);
    assert_eq!(driver.stats().cycle_count, 50);
}

#[test]
fn disabled_autonomous_disabled_publishes_twice() {
    let mut hub = StateChangeHub::new();
    let recorder = Recorder::shared();
    hub.register_for_state_changes(&recorder, Topic::GamePhase).unwrap();
    let mut driver = CycleDriver::new(hub, CycleConfig::default());

    for signals in [
        ModeSignals::empty(),
        ModeSignals::AUTONOMOUS_ENABLED,
        ModeSignals::AUTONOMOUS_ENABLED,
        ModeSignals::AUTONOMOUS,
        ModeSignals::empty(),
    ] {
        driver.step(signals).unwrap();
    }

    assert_eq!(
        phases(&recorder.borrow()),
        [OperatingPhase::Autonomous, OperatingPhase::Disabled]
    );
    assert_eq!(
        recorder.borrow().seen[0],
        (Topic::GamePhase, Payload::Int(OperatingPhase::Autonomous.as_i32()))
    );
}

#[test]
fn test_mode_keeps_the_phase() {
    let mut hub = StateChangeHub::new();
    let recorder = Recorder::shared();
    hub.register_for_state_changes(&recorder, Topic::GamePhase).unwrap();

    hub.run(ModeSignals::AUTONOMOUS_ENABLED).unwrap();
    for _ in 0..5 {
        assert_eq!(hub.run(ModeSignals::TEST_ENABLED), Ok(None));
    }
    assert_eq!(hub.phase(), OperatingPhase::Autonomous);
    assert_eq!(recorder.borrow().seen.len(), 1);
}
