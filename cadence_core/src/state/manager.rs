//! State machine manager: owns one subsystem's states and mechanism and
//! cycles the current state.
//!
//! Per [`run_for_mode`](StateMachineManager::run_for_mode):
//! 1. No current state → enter the default state (`init`).
//! 2. [`Mechanism::run_common_tasks`] on the mechanism.
//! 3. Ask the current state `is_transition_condition(mech, mode ==
//!    ManualOperation)`. On `true` the target is the state's `next_state()`
//!    or, failing that, its first registered transition. A target different
//!    from the current state → `exit` old, `init` new.
//! 4. `run` the (possibly new) current state.
//!
//! All state and transition tables are built at startup; a cycle performs no
//! allocation.

use cadence_common::phase::RunMode;
use tracing::{debug, warn};

use crate::cycle::Subsystem;
use crate::error::{StateError, StateMachineError};
use crate::hub::StateChangeHub;
use crate::state::{Mechanism, State, StateContext, StateId};

/// Boxed state operating on mechanism `M`.
pub type BoxedState<M> = Box<dyn State<M>>;

/// Owner of one subsystem's states, mechanism data and current state.
pub struct StateMachineManager<M> {
    name: String,
    mechanism: M,
    states: Vec<BoxedState<M>>,
    /// Registered transition targets, indexed like `states`.
    transitions: Vec<Vec<usize>>,
    default: usize,
    current: Option<usize>,
    transition_count: u64,
}

impl<M: Mechanism> StateMachineManager<M> {
    /// Build a manager over `states` with `default_state` as the initial
    /// state.
    ///
    /// # Errors
    /// Rejects an empty state set, duplicate ids or names, and a default id
    /// that names no state. Any of these is a fatal startup error.
    pub fn new(
        name: impl Into<String>,
        mechanism: M,
        states: Vec<BoxedState<M>>,
        default_state: StateId,
    ) -> Result<Self, StateMachineError> {
        let name = name.into();
        if states.is_empty() {
            return Err(StateMachineError::NoStates { subsystem: name });
        }

        for (i, state) in states.iter().enumerate() {
            for earlier in &states[..i] {
                if earlier.id() == state.id() {
                    return Err(StateMachineError::DuplicateId {
                        subsystem: name,
                        id: state.id(),
                    });
                }
                if earlier.name() == state.name() {
                    return Err(StateMachineError::DuplicateName {
                        subsystem: name,
                        name: state.name().to_string(),
                    });
                }
            }
        }

        let Some(default) = states.iter().position(|s| s.id() == default_state) else {
            return Err(StateMachineError::UnknownState {
                subsystem: name,
                id: default_state,
            });
        };

        let transitions = vec![Vec::new(); states.len()];
        Ok(Self {
            name,
            mechanism,
            states,
            transitions,
            default,
            current: None,
            transition_count: 0,
        })
    }

    /// Replace the default state by name (config-driven selection).
    ///
    /// Has no effect on a state that is already current.
    pub fn with_default_state_named(mut self, state: &str) -> Result<Self, StateMachineError> {
        let Some(index) = self.states.iter().position(|s| s.name() == state) else {
            return Err(StateMachineError::UnknownStateName {
                subsystem: self.name,
                name: state.to_string(),
            });
        };
        self.default = index;
        Ok(self)
    }

    /// Register `to` as a transition target of `from`.
    ///
    /// Targets are tried in registration order when the state does not name
    /// one itself; only the first is used.
    pub fn register_transition(&mut self, from: StateId, to: StateId) -> Result<(), StateMachineError> {
        let from_index = self.require(from)?;
        let to_index = self.require(to)?;
        self.transitions[from_index].push(to_index);
        Ok(())
    }

    /// Run one cycle of this subsystem for `mode`.
    ///
    /// # Errors
    /// Any fault returned by a state's lifecycle call or by the mechanism's
    /// common tasks, unchanged. A
    /// `next_state()` naming an unknown id is reported as a fault of the
    /// state that named it.
    pub fn run_for_mode(&mut self, mode: RunMode, hub: &StateChangeHub) -> Result<(), StateError> {
        let current = match self.current {
            Some(index) => index,
            None => {
                self.enter(self.default, hub, Some(mode))?;
                self.default
            }
        };

        self.mechanism.run_common_tasks(hub, mode)?;

        let state = &self.states[current];
        if state.is_transition_condition(&self.mechanism, mode.considers_manual_overrides()) {
            match self.resolve_target(current)? {
                Some(target) if target != current => {
                    self.leave(current, hub, Some(mode))?;
                    self.enter(target, hub, Some(mode))?;
                    self.transition_count += 1;
                }
                Some(_) => {
                    debug!(
                        subsystem = %self.name,
                        state = self.states[current].name(),
                        "transition condition names the current state"
                    );
                }
                None => {
                    warn!(
                        subsystem = %self.name,
                        state = self.states[current].name(),
                        "transition condition true but no target registered"
                    );
                }
            }
        }

        self.run_current(hub, Some(mode))
    }

    /// Force `state` current, bypassing transition evaluation.
    ///
    /// Exits the current state (if any and different), enters `state`, and
    /// runs it once when `run` is set. Forcing the state that is already
    /// current does nothing besides the optional run.
    pub fn set_current_state(
        &mut self,
        state: StateId,
        run: bool,
        hub: &StateChangeHub,
    ) -> Result<(), StateError> {
        let target = self
            .index_of(state)
            .ok_or_else(|| StateError::fault(&self.name, format!("no state with id {state}")))?;

        if self.current != Some(target) {
            if let Some(current) = self.current {
                self.leave(current, hub, None)?;
                self.transition_count += 1;
            }
            self.enter(target, hub, None)?;
        }

        if run {
            self.run_current(hub, None)?;
        }
        Ok(())
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_state_id(&self) -> Option<StateId> {
        self.current.map(|i| self.states[i].id())
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.current.map(|i| self.states[i].name())
    }

    /// Id of the state called `name`.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().find(|s| s.name() == name).map(|s| s.id())
    }

    pub fn default_state_id(&self) -> StateId {
        self.states[self.default].id()
    }

    /// Current state's `at_target()`; `false` before the first cycle.
    pub fn at_target(&self) -> bool {
        self.current
            .is_some_and(|i| self.states[i].at_target(&self.mechanism))
    }

    pub fn mechanism(&self) -> &M {
        &self.mechanism
    }

    pub fn mechanism_mut(&mut self) -> &mut M {
        &mut self.mechanism
    }

    /// Transitions performed (evaluated and forced), not counting the
    /// initial entry of the default state.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn index_of(&self, id: StateId) -> Option<usize> {
        self.states.iter().position(|s| s.id() == id)
    }

    fn require(&self, id: StateId) -> Result<usize, StateMachineError> {
        self.index_of(id).ok_or_else(|| StateMachineError::UnknownState {
            subsystem: self.name.clone(),
            id,
        })
    }

    fn resolve_target(&self, current: usize) -> Result<Option<usize>, StateError> {
        let state = &self.states[current];
        match state.next_state(&self.mechanism) {
            Some(id) => self.index_of(id).map(Some).ok_or_else(|| {
                StateError::fault(
                    state.name(),
                    format!("transition target {id} is not a state of '{}'", self.name),
                )
            }),
            None => Ok(self.transitions[current].first().copied()),
        }
    }

    fn enter(&mut self, index: usize, hub: &StateChangeHub, mode: Option<RunMode>) -> Result<(), StateError> {
        let from = self.current.map(|i| self.states[i].name().to_string());
        // Current before init: a faulting init still leaves exactly one
        // current state.
        self.current = Some(index);
        let state = &mut self.states[index];
        debug!(
            subsystem = %self.name,
            from = from.as_deref().unwrap_or("-"),
            to = state.name(),
            "entering state"
        );
        let mut ctx = StateContext::new(&mut self.mechanism, hub, mode);
        state.init(&mut ctx)
    }

    fn leave(&mut self, index: usize, hub: &StateChangeHub, mode: Option<RunMode>) -> Result<(), StateError> {
        let state = &mut self.states[index];
        let mut ctx = StateContext::new(&mut self.mechanism, hub, mode);
        state.exit(&mut ctx)
    }

    fn run_current(&mut self, hub: &StateChangeHub, mode: Option<RunMode>) -> Result<(), StateError> {
        let Some(index) = self.current else {
            return Ok(());
        };
        let state = &mut self.states[index];
        let mut ctx = StateContext::new(&mut self.mechanism, hub, mode);
        state.run(&mut ctx)
    }
}

impl<M: Mechanism> Subsystem for StateMachineManager<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run_for_mode(&mut self, mode: RunMode, hub: &StateChangeHub) -> Result<(), StateError> {
        StateMachineManager::run_for_mode(self, mode, hub)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
