//! Shared fixtures: a recording subscriber and a lifecycle-logging state.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_common::payload::Payload;
use cadence_common::topic::Topic;
use cadence_core::broker::StateChangeSubscriber;
use cadence_core::error::{StateError, SubscriberFault};
use cadence_core::state::{Mechanism, State, StateContext, StateId};

/// Records every delivery, in order.
#[derive(Default)]
pub struct Recorder {
    pub seen: Vec<(Topic, Payload)>,
}

impl Recorder {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn on(&self, topic: Topic) -> Vec<Payload> {
        self.seen
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl StateChangeSubscriber for Recorder {
    fn on_state_change(&mut self, topic: Topic, payload: &Payload) -> Result<(), SubscriberFault> {
        self.seen.push((topic, *payload));
        Ok(())
    }
}

/// Mechanism for the Idle/Moving scenario.
#[derive(Default)]
pub struct Axis {
    pub target_set: bool,
    pub at_target: bool,
    pub calls: Vec<String>,
}

impl Mechanism for Axis {}

impl Axis {
    pub fn take_calls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.calls)
    }
}

pub type Trigger = fn(&Axis, bool) -> bool;

/// State that logs each lifecycle call into the mechanism.
pub struct Logged {
    pub name: &'static str,
    pub id: StateId,
    pub trigger: Trigger,
}

impl State<Axis> for Logged {
    fn name(&self) -> &str {
        self.name
    }

    fn id(&self) -> StateId {
        self.id
    }

    fn init(&mut self, ctx: &mut StateContext<'_, Axis>) -> Result<(), StateError> {
        ctx.mechanism.calls.push(format!("{}.init", self.name));
        Ok(())
    }

    fn run(&mut self, ctx: &mut StateContext<'_, Axis>) -> Result<(), StateError> {
        ctx.mechanism.calls.push(format!("{}.run", self.name));
        Ok(())
    }

    fn exit(&mut self, ctx: &mut StateContext<'_, Axis>) -> Result<(), StateError> {
        ctx.mechanism.calls.push(format!("{}.exit", self.name));
        Ok(())
    }

    fn at_target(&self, axis: &Axis) -> bool {
        axis.at_target
    }

    fn is_transition_condition(&self, axis: &Axis, consider_manual_overrides: bool) -> bool {
        (self.trigger)(axis, consider_manual_overrides)
    }
}
