//! Prelude module for common re-exports.
//!
//! ```rust
//! use cadence_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, CoreConfig, CycleConfig, RobotVariant, SharedConfig,
    SubsystemConfig,
};

// ─── Topics & Payloads ──────────────────────────────────────────────
pub use crate::payload::{
    Angle, AngularVelocity, Length, LinearVelocity, Payload, PayloadKind, PayloadValue, Pose2d,
};
pub use crate::topic::{Topic, TopicId, TypedTopic, topics};

// ─── Phase & Modes ──────────────────────────────────────────────────
pub use crate::phase::{ModeSignals, OperatingPhase, RunMode};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_PERIOD_US, MAX_SUBSCRIBERS_PER_TOPIC};
