//! Workspace-wide constants for Cadence.
//!
//! Single source of truth for numeric limits and default paths.

/// Maximum number of subscriber registrations per topic.
///
/// Broker subscriber lists are pre-allocated to this size at hub construction.
pub const MAX_SUBSCRIBERS_PER_TOPIC: usize = 32;

/// Default control cycle period in microseconds (50 Hz).
pub const DEFAULT_CYCLE_PERIOD_US: u32 = 20_000;

/// Shortest accepted control cycle period in microseconds.
pub const MIN_CYCLE_PERIOD_US: u32 = 1_000;

/// Longest accepted control cycle period in microseconds.
pub const MAX_CYCLE_PERIOD_US: u32 = 1_000_000;

/// Default number of cycles between statistics log lines.
pub const DEFAULT_STATS_INTERVAL: u32 = 250;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/cadence.toml";
