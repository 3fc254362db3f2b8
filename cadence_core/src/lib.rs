//! # Cadence Core Library
//!
//! Runtime core of a cyclic, mode-driven control application:
//!
//! - a typed state-change bus: one [`broker::Broker`] per topic, owned by the
//!   [`hub::StateChangeHub`], with synchronous in-order fan-out and the
//!   derived operating phase published on change;
//! - per-subsystem state machines ([`state::State`],
//!   [`state::manager::StateMachineManager`]) re-evaluated once per cycle for
//!   the active run mode;
//! - the fixed-period [`cycle::CycleDriver`] that runs the hub and then every
//!   subsystem.
//!
//! ## Execution Model
//!
//! Single-threaded and cooperative. Everything in this crate is `!Send`; the
//! only value shared with another thread is the host's shutdown flag.
//!
//! ```text
//! CycleDriver::step(signals)
//!   ├─ hub.run(signals)            phase derived, published on change
//!   └─ for each subsystem          only in autonomous / manual operation
//!        └─ run_for_mode(mode, &hub)
//!             ├─ mechanism.run_common_tasks(&hub, mode)
//!             └─ state.init/run/exit ── hub.publish(topic, value)
//!                                          └─ subscriber.on_state_change
//! ```

pub mod broker;
pub mod cache;
pub mod cycle;
pub mod error;
pub mod hub;
pub mod sim;
pub mod state;
