//! Operating phase, host mode signals and run modes.
//!
//! The host reports raw [`ModeSignals`] once per cycle. The hub folds them
//! into the derived [`OperatingPhase`]; the cycle driver maps them onto the
//! [`RunMode`] handed to every state machine.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Mode signals reported by the host run-loop for the current cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeSignals: u8 {
        /// Outputs are enabled.
        const ENABLED    = 0x01;
        /// Autonomous period selected.
        const AUTONOMOUS = 0x02;
        /// Operator-controlled period selected.
        const MANUAL     = 0x04;
        /// Test mode selected.
        const TEST       = 0x08;
    }
}

impl Default for ModeSignals {
    fn default() -> Self {
        Self::empty()
    }
}

impl ModeSignals {
    /// Enabled + autonomous.
    pub const AUTONOMOUS_ENABLED: Self =
        Self::from_bits_truncate(Self::ENABLED.bits() | Self::AUTONOMOUS.bits());

    /// Enabled + manual operation.
    pub const MANUAL_ENABLED: Self =
        Self::from_bits_truncate(Self::ENABLED.bits() | Self::MANUAL.bits());

    /// Enabled + test.
    pub const TEST_ENABLED: Self =
        Self::from_bits_truncate(Self::ENABLED.bits() | Self::TEST.bits());

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.contains(Self::ENABLED)
    }

    /// Run mode the state machines execute this cycle, if any.
    ///
    /// Disabled and test cycles run no state.
    pub const fn run_mode(&self) -> Option<RunMode> {
        if !self.is_enabled() {
            None
        } else if self.contains(Self::AUTONOMOUS) {
            Some(RunMode::Autonomous)
        } else if self.contains(Self::MANUAL) {
            Some(RunMode::ManualOperation)
        } else {
            None
        }
    }
}

/// Derived operating phase, published on `Topic::GamePhase` as `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperatingPhase {
    Disabled = 0,
    Autonomous = 1,
    ManualOperation = 2,
}

impl OperatingPhase {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Autonomous),
            2 => Some(Self::ManualOperation),
            _ => None,
        }
    }

    /// Decode the value carried on the game-phase topic.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        if value < 0 || value > u8::MAX as i32 {
            None
        } else {
            Self::from_u8(value as u8)
        }
    }

    #[inline]
    pub const fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Fold this cycle's signals into a phase.
    ///
    /// Not enabled → `Disabled`; else autonomous → `Autonomous`; else manual →
    /// `ManualOperation`; otherwise (test, or no period selected) the previous
    /// phase is kept.
    pub const fn derive(signals: ModeSignals, previous: Self) -> Self {
        if !signals.is_enabled() {
            Self::Disabled
        } else if signals.contains(ModeSignals::AUTONOMOUS) {
            Self::Autonomous
        } else if signals.contains(ModeSignals::MANUAL) {
            Self::ManualOperation
        } else {
            previous
        }
    }
}

impl Default for OperatingPhase {
    fn default() -> Self {
        Self::Disabled
    }
}

impl fmt::Display for OperatingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::Autonomous => "autonomous",
            Self::ManualOperation => "manual",
        };
        f.write_str(s)
    }
}

/// Mode a state machine is run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunMode {
    Autonomous = 0,
    ManualOperation = 1,
}

impl RunMode {
    /// Operator-input-driven transitions are only considered in manual operation.
    #[inline]
    pub const fn considers_manual_overrides(&self) -> bool {
        matches!(self, Self::ManualOperation)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
