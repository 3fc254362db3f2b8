//! Closed topic registry.
//!
//! Every kind of state change the application recognises is one [`Topic`].
//! The enumeration is contiguous from `0`; the reserved range
//! `[Topic::RANGE_START, Topic::RANGE_END)` sizes the hub's broker table and
//! is the only valid range for publish/subscribe. Adding a topic means
//! extending the enumeration, [`Topic::ALL`] and the name table; there is no
//! runtime registration.
//!
//! Each topic is bound to exactly one [`PayloadKind`] for the lifetime of the
//! application. [`TypedTopic`] lifts that binding into the type system.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use thiserror::Error;

use crate::payload::{
    Angle, AngularVelocity, Length, LinearVelocity, PayloadKind, PayloadValue, Pose2d,
};

/// Raw topic identifier as it crosses a configuration or API boundary.
///
/// Resolved against the registry with [`Topic::from_id`]; identifiers outside
/// the valid range resolve to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(pub u16);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<Topic> for TopicId {
    #[inline]
    fn from(topic: Topic) -> Self {
        topic.id()
    }
}

/// Every state change the application recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum Topic {
    /// Derived operating phase (`OperatingPhase as i32`). Published by the hub.
    GamePhase = 0,
    /// Operator-selected scoring mode.
    ScoringMode = 1,
    /// Estimated chassis pose on the field.
    ChassisPose = 2,
    /// Chassis translational speed.
    ChassisSpeed = 3,
    /// Chassis yaw rate.
    ChassisAngularVelocity = 4,
    /// Chassis pitch (tip detection).
    ChassisPitch = 5,
    /// Elevator carriage height.
    ElevatorHeight = 6,
    /// Arm angle from horizontal.
    ArmAngle = 7,
    /// A game piece is held by the intake.
    GamePieceHeld = 8,
    /// Vision has a valid target in view.
    VisionTargetVisible = 9,
    /// Climber armed.
    ClimbArmed = 10,
    /// Battery voltage [V].
    BatteryVoltage = 11,
    /// Match time remaining [s].
    MatchTimeRemaining = 12,
    /// Alliance colour (0 = unknown, 1 = red, 2 = blue).
    AllianceColor = 13,
}

const_assert_eq!(Topic::AllianceColor as usize + 1, Topic::COUNT);

impl Topic {
    /// Number of topics in the registry.
    pub const COUNT: usize = 14;

    /// First identifier of the brokered range (inclusive).
    pub const RANGE_START: u16 = 0;

    /// End of the brokered range (exclusive).
    pub const RANGE_END: u16 = Self::COUNT as u16;

    /// All topics in identifier order.
    pub const ALL: [Topic; Self::COUNT] = [
        Self::GamePhase,
        Self::ScoringMode,
        Self::ChassisPose,
        Self::ChassisSpeed,
        Self::ChassisAngularVelocity,
        Self::ChassisPitch,
        Self::ElevatorHeight,
        Self::ArmAngle,
        Self::GamePieceHeld,
        Self::VisionTargetVisible,
        Self::ClimbArmed,
        Self::BatteryVoltage,
        Self::MatchTimeRemaining,
        Self::AllianceColor,
    ];

    /// Resolve a raw identifier. Returns `None` outside `[RANGE_START, RANGE_END)`.
    #[inline]
    pub const fn from_id(id: TopicId) -> Option<Self> {
        let offset = id.0.wrapping_sub(Self::RANGE_START) as usize;
        if offset < Self::COUNT {
            Some(Self::ALL[offset])
        } else {
            None
        }
    }

    #[inline]
    pub const fn id(&self) -> TopicId {
        TopicId(*self as u16)
    }

    /// Position of this topic in a table built from [`Topic::ALL`].
    #[inline]
    pub const fn index(&self) -> usize {
        (*self as u16 - Self::RANGE_START) as usize
    }

    /// Payload kind conventionally carried by this topic.
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::GamePhase | Self::ScoringMode | Self::AllianceColor => PayloadKind::Int,
            Self::ChassisPose => PayloadKind::Pose,
            Self::ChassisSpeed => PayloadKind::LinearVelocity,
            Self::ChassisAngularVelocity => PayloadKind::AngularVelocity,
            Self::ChassisPitch | Self::ArmAngle => PayloadKind::Angle,
            Self::ElevatorHeight => PayloadKind::Length,
            Self::GamePieceHeld | Self::VisionTargetVisible | Self::ClimbArmed => {
                PayloadKind::Bool
            }
            Self::BatteryVoltage | Self::MatchTimeRemaining => PayloadKind::Float,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::GamePhase => "GamePhase",
            Self::ScoringMode => "ScoringMode",
            Self::ChassisPose => "ChassisPose",
            Self::ChassisSpeed => "ChassisSpeed",
            Self::ChassisAngularVelocity => "ChassisAngularVelocity",
            Self::ChassisPitch => "ChassisPitch",
            Self::ElevatorHeight => "ElevatorHeight",
            Self::ArmAngle => "ArmAngle",
            Self::GamePieceHeld => "GamePieceHeld",
            Self::VisionTargetVisible => "VisionTargetVisible",
            Self::ClimbArmed => "ClimbArmed",
            Self::BatteryVoltage => "BatteryVoltage",
            Self::MatchTimeRemaining => "MatchTimeRemaining",
            Self::AllianceColor => "AllianceColor",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topic name lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown topic '{0}'")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

// ─── Typed Topics ───────────────────────────────────────────────────

/// A topic whose payload type is fixed at compile time.
///
/// Constructing a `TypedTopic<T>` for a topic bound to a different kind fails
/// const evaluation, so the constants in [`topics`] cannot drift from
/// [`Topic::kind`].
pub struct TypedTopic<T> {
    topic: Topic,
    _value: PhantomData<fn() -> T>,
}

impl<T: PayloadValue> TypedTopic<T> {
    /// Bind `topic` to `T`. Panics (at compile time in const items) if the
    /// topic carries another kind.
    pub const fn new(topic: Topic) -> Self {
        assert!(
            topic.kind() as u8 == T::KIND as u8,
            "topic payload kind does not match the typed topic value"
        );
        Self {
            topic,
            _value: PhantomData,
        }
    }

    #[inline]
    pub const fn topic(&self) -> Topic {
        self.topic
    }
}

impl<T> Clone for TypedTopic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedTopic<T> {}

impl<T> fmt::Debug for TypedTopic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedTopic").field(&self.topic).finish()
    }
}

/// Typed handles for every topic in the registry.
pub mod topics {
    use super::*;

    pub const GAME_PHASE: TypedTopic<i32> = TypedTopic::new(Topic::GamePhase);
    pub const SCORING_MODE: TypedTopic<i32> = TypedTopic::new(Topic::ScoringMode);
    pub const CHASSIS_POSE: TypedTopic<Pose2d> = TypedTopic::new(Topic::ChassisPose);
    pub const CHASSIS_SPEED: TypedTopic<LinearVelocity> = TypedTopic::new(Topic::ChassisSpeed);
    pub const CHASSIS_ANGULAR_VELOCITY: TypedTopic<AngularVelocity> =
        TypedTopic::new(Topic::ChassisAngularVelocity);
    pub const CHASSIS_PITCH: TypedTopic<Angle> = TypedTopic::new(Topic::ChassisPitch);
    pub const ELEVATOR_HEIGHT: TypedTopic<Length> = TypedTopic::new(Topic::ElevatorHeight);
    pub const ARM_ANGLE: TypedTopic<Angle> = TypedTopic::new(Topic::ArmAngle);
    pub const GAME_PIECE_HELD: TypedTopic<bool> = TypedTopic::new(Topic::GamePieceHeld);
    pub const VISION_TARGET_VISIBLE: TypedTopic<bool> =
        TypedTopic::new(Topic::VisionTargetVisible);
    pub const CLIMB_ARMED: TypedTopic<bool> = TypedTopic::new(Topic::ClimbArmed);
    pub const BATTERY_VOLTAGE: TypedTopic<f64> = TypedTopic::new(Topic::BatteryVoltage);
    pub const MATCH_TIME_REMAINING: TypedTopic<f64> = TypedTopic::new(Topic::MatchTimeRemaining);
    pub const ALLIANCE_COLOR: TypedTopic<i32> = TypedTopic::new(Topic::AllianceColor);
}

// ─── Tests ──────────────────────────────────────────────────────────
