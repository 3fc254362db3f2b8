//! Per-subsystem state machines.
//!
//! A subsystem describes its behavior as a fixed set of [`State`]s operating
//! on the subsystem's mechanism data `M`. The
//! [`StateMachineManager`](manager::StateMachineManager) owns the states and
//! the mechanism, and re-evaluates the current state once per cycle.
//!
//! ## Lifecycle
//! ```text
//!   (no current) ──enter default──▶ Init ─▶ Run ─▶ Run ─▶ … ─▶ Exit
//!                                     ▲                          │
//!                                     └──── transition target ◀──┘
//! ```
//! `init` runs exactly once on entry, before the first `run`; `exit` runs
//! exactly once on leave, after the last `run`. There is no terminal state.
//!
//! Work the mechanism does every cycle regardless of the current state
//! (sensor integration, target refresh) goes in
//! [`Mechanism::run_common_tasks`], which the manager calls before it
//! evaluates transitions.

pub mod manager;

use cadence_common::phase::RunMode;

use crate::error::StateError;
use crate::hub::StateChangeHub;

/// Stable numeric state identifier, unique within one subsystem.
pub type StateId = u16;

/// Subsystem mechanism data driven by a
/// [`StateMachineManager`](manager::StateMachineManager).
pub trait Mechanism {
    /// Called once per cycle, before transition evaluation and whatever the
    /// current state is. A fault aborts the cycle before any state runs.
    fn run_common_tasks(&mut self, hub: &StateChangeHub, mode: RunMode) -> Result<(), StateError> {
        let _ = (hub, mode);
        Ok(())
    }
}

/// What a state sees while one of its lifecycle calls runs.
pub struct StateContext<'a, M> {
    /// The subsystem's mechanism data.
    pub mechanism: &'a mut M,
    /// Hub for publishing state changes.
    pub hub: &'a StateChangeHub,
    /// Mode of the current cycle. `None` for a transition forced outside a
    /// cycle by [`set_current_state`](manager::StateMachineManager::set_current_state).
    pub mode: Option<RunMode>,
}

impl<'a, M> StateContext<'a, M> {
    pub fn new(mechanism: &'a mut M, hub: &'a StateChangeHub, mode: Option<RunMode>) -> Self {
        Self {
            mechanism,
            hub,
            mode,
        }
    }
}

/// One named mode of a subsystem's behavior.
///
/// Lifecycle calls may publish through `ctx.hub`; any fault they return
/// propagates unchanged to the caller of the manager.
pub trait State<M> {
    /// Stable state name, unique within the subsystem.
    fn name(&self) -> &str;

    /// Stable state id, unique within the subsystem.
    fn id(&self) -> StateId;

    /// Called once when the state becomes current.
    fn init(&mut self, ctx: &mut StateContext<'_, M>) -> Result<(), StateError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per cycle while the state is current.
    fn run(&mut self, ctx: &mut StateContext<'_, M>) -> Result<(), StateError>;

    /// Called once when the state stops being current.
    fn exit(&mut self, ctx: &mut StateContext<'_, M>) -> Result<(), StateError> {
        let _ = ctx;
        Ok(())
    }

    /// True when the state judges its commanded goal reached.
    ///
    /// Pure query; never causes a transition by itself.
    fn at_target(&self, mechanism: &M) -> bool;

    /// Whether the manager should leave this state.
    ///
    /// With `consider_manual_overrides == false` (autonomous cycles),
    /// predicates driven only by operator input must be ignored.
    fn is_transition_condition(&self, mechanism: &M, consider_manual_overrides: bool) -> bool;

    /// Explicit transition target. When `None`, the manager uses the first
    /// transition registered for this state.
    fn next_state(&self, mechanism: &M) -> Option<StateId> {
        let _ = mechanism;
        None
    }
}
