//! Integration test: Idle/Moving subsystem driven through the cycle driver.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_common::config::CycleConfig;
use cadence_common::payload::Payload;
use cadence_common::phase::{ModeSignals, RunMode};
use cadence_common::topic::{Topic, topics};
use cadence_core::cycle::{CycleDriver, Subsystem};
use cadence_core::error::StateError;
use cadence_core::hub::StateChangeHub;
use cadence_core::state::manager::{BoxedState, StateMachineManager};

use super::common::{Axis, Logged};

const IDLE: u16 = 0;
const MOVING: u16 = 1;

fn idle_moving() -> StateMachineManager<Axis> {
    let states: Vec<BoxedState<Axis>> = vec![
        Box::new(Logged {
            name: "Idle",
            id: IDLE,
            trigger: |axis, _| axis.target_set,
        }),
        Box::new(Logged {
            name: "Moving",
            id: MOVING,
            trigger: |axis, _| axis.at_target,
        }),
    ];
    let mut manager = StateMachineManager::new("x", Axis::default(), states, IDLE).unwrap();
    manager.register_transition(IDLE, MOVING).unwrap();
    manager.register_transition(MOVING, IDLE).unwrap();
    manager
}

#[test]
fn idle_moving_end_to_end() {
    let hub = StateChangeHub::new();
    let mut x = idle_moving();

    x.run_for_mode(RunMode::ManualOperation, &hub).unwrap();
    assert_eq!(x.current_state_name(), Some("Idle"));
    assert_eq!(x.mechanism_mut().take_calls(), ["Idle.init", "Idle.run"]);

    x.mechanism_mut().target_set = true;
    x.run_for_mode(RunMode::ManualOperation, &hub).unwrap();
    assert_eq!(
        x.mechanism_mut().take_calls(),
        ["Idle.exit", "Moving.init", "Moving.run"]
    );

    x.mechanism_mut().target_set = false;
    x.mechanism_mut().at_target = true;
    x.run_for_mode(RunMode::ManualOperation, &hub).unwrap();
    assert_eq!(
        x.mechanism_mut().take_calls(),
        ["Moving.exit", "Idle.init", "Idle.run"]
    );
    assert_eq!(x.current_state_id(), Some(IDLE));
}

#[test]
fn operator_only_trigger_never_fires_in_autonomous() {
    let hub = StateChangeHub::new();
    let states: Vec<BoxedState<Axis>> = vec![
        Box::new(Logged {
            name: "Hold",
            id: 0,
            trigger: |axis, manual| manual && axis.target_set,
        }),
        Box::new(Logged {
            name: "Release",
            id: 1,
            trigger: |_, _| false,
        }),
    ];
    let mut x = StateMachineManager::new("claw", Axis::default(), states, 0).unwrap();
    x.register_transition(0, 1).unwrap();
    x.mechanism_mut().target_set = true;
    x.mechanism_mut().at_target = true;

    for _ in 0..10 {
        x.run_for_mode(RunMode::Autonomous, &hub).unwrap();
    }
    assert!(x.at_target());
    assert_eq!(x.current_state_name(), Some("Hold"));
    assert_eq!(x.transition_count(), 0);
}

#[test]
fn managers_run_only_while_enabled() {
    let mut driver = CycleDriver::new(StateChangeHub::new(), CycleConfig::default());
    let x = Rc::new(RefCell::new(0u32));

    struct Counter(Rc<RefCell<u32>>);
    impl Subsystem for Counter {
        fn name(&self) -> &str {
            "counter"
        }
        fn run_for_mode(&mut self, _: RunMode, _: &StateChangeHub) -> Result<(), StateError> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    driver.add_subsystem(Box::new(Counter(Rc::clone(&x))));
    driver.add_subsystem(Box::new(idle_moving()));

    for signals in [
        ModeSignals::empty(),
        ModeSignals::AUTONOMOUS_ENABLED,
        ModeSignals::TEST_ENABLED,
        ModeSignals::AUTONOMOUS | ModeSignals::MANUAL,
        ModeSignals::MANUAL_ENABLED,
    ] {
        driver.step(signals).unwrap();
    }
    assert_eq!(*x.borrow(), 2);
}

#[test]
fn state_publishes_reach_other_subscribers() {
    use cadence_common::payload::Length;
    use cadence_core::state::{State, StateContext};

    struct Report;
    impl State<Axis> for Report {
        fn name(&self) -> &str {
            "Report"
        }
        fn id(&self) -> u16 {
            0
        }
        fn run(&mut self, ctx: &mut StateContext<'_, Axis>) -> Result<(), StateError> {
            ctx.hub
                .publish(topics::ELEVATOR_HEIGHT, Length::from_inches(10.0))?;
            Ok(())
        }
        fn at_target(&self, _: &Axis) -> bool {
            true
        }
        fn is_transition_condition(&self, _: &Axis, _: bool) -> bool {
            false
        }
    }

    let mut hub = StateChangeHub::new();
    let recorder = super::common::Recorder::shared();
    hub.register_for_state_changes(&recorder, Topic::ElevatorHeight)
        .unwrap();

    let states: Vec<BoxedState<Axis>> = vec![Box::new(Report)];
    let manager = StateMachineManager::new("reporter", Axis::default(), states, 0).unwrap();
    let mut driver = CycleDriver::new(hub, CycleConfig::default());
    driver.add_subsystem(Box::new(manager));

    driver.step(ModeSignals::MANUAL_ENABLED).unwrap();
    driver.step(ModeSignals::MANUAL_ENABLED).unwrap();

    let heights = recorder.borrow().on(Topic::ElevatorHeight);
    assert_eq!(heights.len(), 2);
    assert_eq!(heights[0], Payload::Length(Length::from_inches(10.0)));
}
