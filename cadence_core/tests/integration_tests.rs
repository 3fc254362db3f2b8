//! Integration tests for the Cadence core.
//!
//! These exercise the hub, the state machine manager and the cycle driver
//! together through the public API only.

mod integration;
