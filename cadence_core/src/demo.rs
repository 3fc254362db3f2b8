//! Demo subsystems for the simulation host.
//!
//! - `operator`: stands in for the driver station. In manual operation it
//!   steps the requested scoring level every few seconds and publishes it on
//!   `ScoringMode`. Not a state machine, so it rejects a `default_state`.
//! - `elevator`: an Idle/Moving state machine. It follows the operator's
//!   scoring level in manual operation and drives to a fixed scoring height
//!   in autonomous. The carriage itself is integrated in the mechanism's
//!   common tasks, which publish the height while the drive is on.
//! - A game-phase logger subscriber.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cadence_common::config::SubsystemConfig;
use cadence_common::payload::{Length, Payload};
use cadence_common::phase::{OperatingPhase, RunMode};
use cadence_common::topic::{Topic, topics};
use cadence_core::broker::StateChangeSubscriber;
use cadence_core::cache::TopicCache;
use cadence_core::cycle::Subsystem;
use cadence_core::error::{HubError, StateError, StateMachineError, SubscriberFault};
use cadence_core::hub::StateChangeHub;
use cadence_core::state::manager::{BoxedState, StateMachineManager};
use cadence_core::state::{Mechanism, State, StateContext, StateId};
use thiserror::Error;
use tracing::{debug, info};

/// Elevator heights for scoring levels 0, 1 and 2.
const LEVEL_HEIGHTS_M: [f64; 3] = [0.0, 0.6, 1.2];
const AUTON_SCORE_HEIGHT_M: f64 = 1.2;
const ELEVATOR_SPEED_M_PER_S: f64 = 0.8;
const HEIGHT_TOLERANCE_M: f64 = 0.005;
/// Seconds between two operator level changes.
const OPERATOR_PERIOD_S: f64 = 1.5;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("unknown demo subsystem '{0}'")]
    UnknownSubsystem(String),

    #[error("subsystem '{0}' has no states; remove its default_state")]
    UnexpectedDefaultState(String),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Build every enabled subsystem named in `configs`, in config order.
pub fn build_subsystems(
    configs: &[SubsystemConfig],
    hub: &mut StateChangeHub,
    period: Duration,
) -> Result<Vec<Box<dyn Subsystem>>, DemoError> {
    let mut subsystems: Vec<Box<dyn Subsystem>> = Vec::new();
    for config in configs.iter().filter(|c| c.enabled) {
        let subsystem: Box<dyn Subsystem> = match config.name.as_str() {
            "operator" => {
                if config.default_state.is_some() {
                    return Err(DemoError::UnexpectedDefaultState(config.name.clone()));
                }
                Box::new(OperatorConsole::new(period))
            }
            "elevator" => {
                let machine = elevator(hub, period)?;
                match &config.default_state {
                    Some(state) => Box::new(machine.with_default_state_named(state)?),
                    None => Box::new(machine),
                }
            }
            other => return Err(DemoError::UnknownSubsystem(other.to_string())),
        };
        info!(subsystem = %config.name, default_state = ?config.default_state, "subsystem built");
        subsystems.push(subsystem);
    }
    Ok(subsystems)
}

// ─── Game Phase Logger ──────────────────────────────────────────────

/// Logs every published operating phase.
#[derive(Debug, Default)]
pub struct PhaseLogger {
    pub changes: u32,
}

impl StateChangeSubscriber for PhaseLogger {
    fn on_state_change(&mut self, _topic: Topic, payload: &Payload) -> Result<(), SubscriberFault> {
        let phase = payload
            .get::<i32>()
            .and_then(OperatingPhase::from_i32)
            .ok_or_else(|| SubscriberFault::new(format!("not a phase: {payload:?}")))?;
        self.changes += 1;
        info!(%phase, changes = self.changes, "game phase");
        Ok(())
    }
}

// ─── Operator Console ───────────────────────────────────────────────

struct OperatorConsole {
    cycles_per_step: u64,
    cycles: u64,
    level: i32,
}

impl OperatorConsole {
    fn new(period: Duration) -> Self {
        let cycles_per_step = (OPERATOR_PERIOD_S / period.as_secs_f64()).round().max(1.0) as u64;
        Self {
            cycles_per_step,
            cycles: 0,
            level: 0,
        }
    }
}

impl Subsystem for OperatorConsole {
    fn name(&self) -> &str {
        "operator"
    }

    fn run_for_mode(&mut self, mode: RunMode, hub: &StateChangeHub) -> Result<(), StateError> {
        if mode != RunMode::ManualOperation {
            return Ok(());
        }
        if self.cycles % self.cycles_per_step == 0 {
            self.level = (self.level + 1) % LEVEL_HEIGHTS_M.len() as i32;
            hub.publish(topics::SCORING_MODE, self.level)?;
        }
        self.cycles += 1;
        Ok(())
    }
}

// ─── Elevator ───────────────────────────────────────────────────────

const IDLE: StateId = 0;
const MOVING: StateId = 1;

/// Elevator mechanism data.
pub struct Elevator {
    height: Length,
    target: Length,
    step_m: f64,
    driving: bool,
    inputs: Rc<RefCell<TopicCache>>,
}

impl Mechanism for Elevator {
    fn run_common_tasks(&mut self, hub: &StateChangeHub, _mode: RunMode) -> Result<(), StateError> {
        if !self.driving {
            return Ok(());
        }
        let error = self.target.meters() - self.height.meters();
        let step = error.clamp(-self.step_m, self.step_m);
        self.height = Length::from_meters(self.height.meters() + step);
        hub.publish(topics::ELEVATOR_HEIGHT, self.height)?;
        Ok(())
    }
}

impl Elevator {
    fn at_target(&self) -> bool {
        (self.target.meters() - self.height.meters()).abs() <= HEIGHT_TOLERANCE_M
    }

    fn operator_target(&self) -> Option<Length> {
        let level = self.inputs.borrow().get_typed(topics::SCORING_MODE)?;
        let height = LEVEL_HEIGHTS_M.get(usize::try_from(level).ok()?)?;
        Some(Length::from_meters(*height))
    }
}

/// Build the elevator state machine and register its inputs on `hub`.
pub fn elevator(
    hub: &mut StateChangeHub,
    period: Duration,
) -> Result<StateMachineManager<Elevator>, DemoError> {
    let inputs = TopicCache::subscribe(hub, &[Topic::ScoringMode])?;
    let mechanism = Elevator {
        height: Length::default(),
        target: Length::default(),
        step_m: ELEVATOR_SPEED_M_PER_S * period.as_secs_f64(),
        driving: false,
        inputs,
    };
    let states: Vec<BoxedState<Elevator>> = vec![Box::new(Idle), Box::new(Moving)];
    let mut manager = StateMachineManager::new("elevator", mechanism, states, IDLE)?;
    manager.register_transition(IDLE, MOVING)?;
    manager.register_transition(MOVING, IDLE)?;
    Ok(manager)
}

struct Idle;

impl State<Elevator> for Idle {
    fn name(&self) -> &str {
        "Idle"
    }

    fn id(&self) -> StateId {
        IDLE
    }

    fn run(&mut self, ctx: &mut StateContext<'_, Elevator>) -> Result<(), StateError> {
        let elevator = &mut *ctx.mechanism;
        match ctx.mode {
            Some(RunMode::Autonomous) => elevator.target = Length::from_meters(AUTON_SCORE_HEIGHT_M),
            Some(RunMode::ManualOperation) => {
                if let Some(target) = elevator.operator_target() {
                    elevator.target = target;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn at_target(&self, elevator: &Elevator) -> bool {
        elevator.at_target()
    }

    fn is_transition_condition(&self, elevator: &Elevator, _consider_manual_overrides: bool) -> bool {
        !elevator.at_target()
    }
}

struct Moving;

impl State<Elevator> for Moving {
    fn name(&self) -> &str {
        "Moving"
    }

    fn id(&self) -> StateId {
        MOVING
    }

    fn init(&mut self, ctx: &mut StateContext<'_, Elevator>) -> Result<(), StateError> {
        ctx.mechanism.driving = true;
        debug!(
            from_m = ctx.mechanism.height.meters(),
            to_m = ctx.mechanism.target.meters(),
            "elevator moving"
        );
        Ok(())
    }

    fn run(&mut self, ctx: &mut StateContext<'_, Elevator>) -> Result<(), StateError> {
        // Follow a level change made while the carriage travels.
        if ctx.mode == Some(RunMode::ManualOperation) {
            if let Some(target) = ctx.mechanism.operator_target() {
                ctx.mechanism.target = target;
            }
        }
        Ok(())
    }

    fn exit(&mut self, ctx: &mut StateContext<'_, Elevator>) -> Result<(), StateError> {
        ctx.mechanism.driving = false;
        info!(height_m = ctx.mechanism.height.meters(), "elevator at target");
        Ok(())
    }

    fn at_target(&self, elevator: &Elevator) -> bool {
        elevator.at_target()
    }

    fn is_transition_condition(&self, elevator: &Elevator, _consider_manual_overrides: bool) -> bool {
        elevator.at_target()
    }
}
