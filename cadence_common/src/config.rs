//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration of
//! a Cadence application: logging, cycle timing, per-robot identification,
//! per-subsystem default states and the simulation mode timeline.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cadence_common::config::{ConfigError, ConfigLoader, CoreConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = CoreConfig::load(Path::new("config/cadence.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    DEFAULT_CYCLE_PERIOD_US, DEFAULT_STATS_INTERVAL, MAX_CYCLE_PERIOD_US, MIN_CYCLE_PERIOD_US,
};
use crate::phase::ModeSignals;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all Cadence applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "cadence-sim"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Control cycle timing.
///
/// ```toml
/// [cycle]
/// period_us = 20000
/// stats_interval = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Fixed cycle period [µs].
    #[serde(default = "default_period_us")]
    pub period_us: u32,

    /// Cycles between statistics log lines (0 = never).
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u32,

    /// CPU core the control thread is pinned to (`rt` feature only).
    #[serde(default = "default_cpu_core")]
    pub cpu_core: usize,

    /// SCHED_FIFO priority (`rt` feature only).
    #[serde(default = "default_rt_priority")]
    pub rt_priority: i32,
}

fn default_period_us() -> u32 {
    DEFAULT_CYCLE_PERIOD_US
}

fn default_stats_interval() -> u32 {
    DEFAULT_STATS_INTERVAL
}

fn default_cpu_core() -> usize {
    1
}

fn default_rt_priority() -> i32 {
    15
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period_us: default_period_us(),
            stats_interval: default_stats_interval(),
            cpu_core: default_cpu_core(),
            rt_priority: default_rt_priority(),
        }
    }
}

impl CycleConfig {
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CYCLE_PERIOD_US..=MAX_CYCLE_PERIOD_US).contains(&self.period_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.period_us {} outside [{MIN_CYCLE_PERIOD_US}, {MAX_CYCLE_PERIOD_US}]",
                self.period_us
            )));
        }
        if !(1..=99).contains(&self.rt_priority) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.rt_priority {} outside [1, 99]",
                self.rt_priority
            )));
        }
        Ok(())
    }
}

// ─── Robot Identification ───────────────────────────────────────────

/// Team number of the competition robot.
pub const COMPETITION_TEAM_NUMBER: u16 = 302;

/// Team number flashed onto the practice robot.
pub const PRACTICE_TEAM_NUMBER: u16 = 9302;

/// Physical robot variant the software is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotVariant {
    Competition,
    Practice,
    Simulation,
}

impl RobotVariant {
    /// Map a controller team number to its robot variant.
    pub const fn from_team_number(team_number: u16) -> Self {
        match team_number {
            COMPETITION_TEAM_NUMBER => Self::Competition,
            PRACTICE_TEAM_NUMBER => Self::Practice,
            _ => Self::Simulation,
        }
    }
}

/// Per-robot identification.
///
/// ```toml
/// [robot]
/// team_number = 302
/// # variant = "practice"   # optional override
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotIdentity {
    #[serde(default)]
    pub team_number: u16,

    /// Explicit variant; derived from `team_number` when absent.
    #[serde(default)]
    pub variant: Option<RobotVariant>,
}

impl RobotIdentity {
    pub fn variant(&self) -> RobotVariant {
        self.variant
            .unwrap_or_else(|| RobotVariant::from_team_number(self.team_number))
    }
}

// ─── Subsystems ─────────────────────────────────────────────────────

/// Per-subsystem startup selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsystemConfig {
    /// Subsystem name, matched against the name the subsystem registers with.
    pub name: String,

    /// Name of the state entered on the first cycle. `None` keeps the
    /// subsystem's built-in default; subsystems that are not state machines
    /// must leave it unset.
    #[serde(default)]
    pub default_state: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Host mode of one simulated timeline segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimMode {
    Disabled,
    Autonomous,
    Manual,
    Test,
}

impl SimMode {
    /// Mode signals the simulated host reports for this segment.
    pub const fn signals(&self) -> ModeSignals {
        match self {
            Self::Disabled => ModeSignals::empty(),
            Self::Autonomous => ModeSignals::AUTONOMOUS_ENABLED,
            Self::Manual => ModeSignals::MANUAL_ENABLED,
            Self::Test => ModeSignals::TEST_ENABLED,
        }
    }
}

/// One segment of the simulated mode timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimSegment {
    #[serde(rename = "phase")]
    pub mode: SimMode,
    pub cycles: u32,
}

/// Simulated host configuration.
///
/// ```toml
/// [sim]
/// timeline = [
///   { phase = "disabled", cycles = 10 },
///   { phase = "autonomous", cycles = 50 },
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    #[serde(default)]
    pub timeline: Vec<SimSegment>,
}

impl SimConfig {
    /// Total number of cycles covered by the timeline.
    pub fn total_cycles(&self) -> u64 {
        self.timeline.iter().map(|s| s.cycles as u64).sum()
    }
}

// ─── Core Config ────────────────────────────────────────────────────

/// Complete configuration of a Cadence application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    pub shared: SharedConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub robot: RobotIdentity,

    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,

    #[serde(default)]
    pub sim: SimConfig,
}

impl CoreConfig {
    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty service name, a
    /// cycle period or RT priority out of bounds, empty or duplicate subsystem
    /// names, empty default-state names, or zero-length timeline segments.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cycle.validate()?;

        let mut seen = HashSet::new();
        for sub in &self.subsystems {
            if sub.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "subsystem name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(sub.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate subsystem '{}'",
                    sub.name
                )));
            }
            if sub.default_state.as_deref() == Some("") {
                return Err(ConfigError::ValidationError(format!(
                    "subsystem '{}' has an empty default_state",
                    sub.name
                )));
            }
        }

        if let Some(i) = self.sim.timeline.iter().position(|s| s.cycles == 0) {
            return Err(ConfigError::ValidationError(format!(
                "sim.timeline[{i}] has zero cycles"
            )));
        }
        Ok(())
    }

    /// Startup selection for the named subsystem.
    pub fn subsystem(&self, name: &str) -> Option<&SubsystemConfig> {
        self.subsystems.iter().find(|s| s.name == name)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
