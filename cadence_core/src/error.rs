//! Error types for the Cadence core.
//!
//! Out-of-range topics are not errors: they are dropped at the hub boundary.
//! Everything else propagates to the caller unchanged; nothing in the core
//! catches, retries or swallows a fault.

use cadence_common::payload::PayloadKind;
use cadence_common::topic::Topic;
use thiserror::Error;

use crate::state::StateId;

/// Failure reported by a subscriber callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SubscriberFault {
    pub reason: String,
}

impl SubscriberFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Fan-out of one payload was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// A subscriber callback failed; later subscribers were not notified.
    #[error("subscriber #{position} on {topic} failed: {source}")]
    Subscriber {
        topic: Topic,
        /// Position of the failing subscriber in subscription order.
        position: usize,
        source: SubscriberFault,
    },

    /// A subscriber was notified while its own callback was still running.
    #[error("re-entrant notification of a subscriber on {topic}")]
    Reentrant { topic: Topic },
}

/// Hub registration or publish failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Published payload kind differs from the kind bound to the topic.
    #[error("{topic} carries {expected}, got {actual}")]
    KindMismatch {
        topic: Topic,
        expected: PayloadKind,
        actual: PayloadKind,
    },

    /// Subscriber does not accept the kind bound to the topic.
    #[error("subscriber does not accept {kind} payloads of {topic}")]
    KindRejected { topic: Topic, kind: PayloadKind },

    /// The subscriber was mutably borrowed while it was being registered.
    #[error("subscriber on {topic} is borrowed elsewhere during registration")]
    SubscriberBusy { topic: Topic },

    /// The topic's pre-allocated subscriber list is full.
    #[error("{topic} already has {capacity} subscribers")]
    CapacityExhausted { topic: Topic, capacity: usize },
}

/// Failure inside a state's lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state '{state}' faulted: {reason}")]
    Fault { state: String, reason: String },

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl StateError {
    pub fn fault(state: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fault {
            state: state.into(),
            reason: reason.into(),
        }
    }
}

/// State machine configuration rejected at construction.
///
/// These are startup errors; a manager that constructs successfully always
/// has a resolvable default state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("subsystem '{subsystem}' has no states")]
    NoStates { subsystem: String },

    #[error("subsystem '{subsystem}' registers state id {id} twice")]
    DuplicateId { subsystem: String, id: StateId },

    #[error("subsystem '{subsystem}' registers state name '{name}' twice")]
    DuplicateName { subsystem: String, name: String },

    #[error("subsystem '{subsystem}' has no state with id {id}")]
    UnknownState { subsystem: String, id: StateId },

    #[error("subsystem '{subsystem}' has no state named '{name}'")]
    UnknownStateName { subsystem: String, name: String },
}

/// Error raised by the cycle driver.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("hub: {0}")]
    Hub(#[from] HubError),

    #[error("subsystem '{name}': {source}")]
    Subsystem { name: String, source: StateError },

    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
}
