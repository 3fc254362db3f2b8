//! Integration test: config-driven run of a scripted timeline to completion.

use std::fs;
use std::sync::atomic::AtomicBool;

use cadence_common::config::{ConfigLoader, CoreConfig};
use cadence_common::phase::OperatingPhase;
use cadence_common::topic::Topic;
use cadence_core::cycle::CycleDriver;
use cadence_core::hub::StateChangeHub;
use cadence_core::sim::ScriptedModeSource;
use cadence_core::state::manager::{BoxedState, StateMachineManager};
use tempfile::TempDir;

use super::common::{Axis, Logged, Recorder};

const CONFIG: &str = r#"
[shared]
service_name = "timeline-test"

[cycle]
period_us = 1000
stats_interval = 0

[[subsystems]]
name = "x"
default_state = "Moving"

[sim]
timeline = [
  { phase = "disabled", cycles = 2 },
  { phase = "autonomous", cycles = 3 },
  { phase = "test", cycles = 2 },
  { phase = "manual", cycles = 4 },
]
"#;

fn build(config: &CoreConfig) -> StateMachineManager<Axis> {
    let states: Vec<BoxedState<Axis>> = vec![
        Box::new(Logged {
            name: "Idle",
            id: 0,
            trigger: |_, _| false,
        }),
        Box::new(Logged {
            name: "Moving",
            id: 1,
            trigger: |_, _| false,
        }),
    ];
    let sub = config.subsystem("x").unwrap();
    let manager = StateMachineManager::new(sub.name.clone(), Axis::default(), states, 0).unwrap();
    match sub.default_state.as_deref() {
        Some(state) => manager.with_default_state_named(state).unwrap(),
        None => manager,
    }
}

/// Write `CONFIG` to a scratch directory and load it the way the host does.
fn load_from_disk() -> CoreConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cadence.toml");
    fs::write(&path, CONFIG).unwrap();
    CoreConfig::load(&path).unwrap()
}

#[test]
fn timeline_runs_to_completion() {
    let config = load_from_disk();
    config.validate().unwrap();

    let mut hub = StateChangeHub::new();
    let phases = Recorder::shared();
    hub.register_for_state_changes(&phases, Topic::GamePhase).unwrap();
    let manager = build(&config);

    let mut driver = CycleDriver::new(hub, config.cycle.clone());
    driver.add_subsystem(Box::new(manager));

    let running = AtomicBool::new(true);
    let mut source = ScriptedModeSource::from_config(&config.sim);
    let executed = driver.run(&mut source, &running, None).unwrap();

    assert_eq!(executed, config.sim.total_cycles());
    assert_eq!(executed, 11);
    assert_eq!(driver.hub().phase(), OperatingPhase::ManualOperation);
    assert_eq!(phases.borrow().seen.len(), 2);
}

#[test]
fn max_cycles_cuts_the_timeline_short() {
    let config = CoreConfig::from_toml(CONFIG).unwrap();
    let mut driver = CycleDriver::new(StateChangeHub::new(), config.cycle.clone());
    let running = AtomicBool::new(true);
    let mut source = ScriptedModeSource::from_config(&config.sim);

    assert_eq!(driver.run(&mut source, &running, Some(4)).unwrap(), 4);
    assert!(!cadence_core::cycle::ModeSource::finished(&source));
    assert_eq!(driver.hub().phase(), OperatingPhase::Autonomous);
}

#[test]
fn configured_default_state_is_entered_first() {
    let config = CoreConfig::from_toml(CONFIG).unwrap();
    let hub = StateChangeHub::new();
    let mut manager = build(&config);

    manager
        .run_for_mode(cadence_common::phase::RunMode::Autonomous, &hub)
        .unwrap();
    assert_eq!(manager.current_state_name(), Some("Moving"));
    assert_eq!(manager.mechanism_mut().take_calls(), ["Moving.init", "Moving.run"]);
}

#[test]
fn file_and_inline_config_agree() {
    let inline = CoreConfig::from_toml(CONFIG).unwrap();
    let disk = load_from_disk();
    assert_eq!(disk.cycle, inline.cycle);
    assert_eq!(disk.subsystems, inline.subsystems);
    assert_eq!(disk.sim, inline.sim);
}
