//! Typed state-change payloads.
//!
//! Every value published on a topic is a [`Payload`]: a tagged variant over a
//! closed set of semantic kinds. Quantities with units are carried as newtypes
//! storing SI base values so that publishers and subscribers never disagree
//! about scale.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

const METERS_PER_INCH: f64 = 0.0254;
const METERS_PER_FOOT: f64 = 0.3048;
const DEGREES_PER_RADIAN: f64 = 180.0 / PI;

// ─── Unit Newtypes ──────────────────────────────────────────────────

/// Linear distance [m].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Length {
    meters: f64,
}

impl Length {
    #[inline]
    pub const fn from_meters(meters: f64) -> Self {
        Self { meters }
    }

    #[inline]
    pub fn from_inches(inches: f64) -> Self {
        Self::from_meters(inches * METERS_PER_INCH)
    }

    #[inline]
    pub const fn meters(&self) -> f64 {
        self.meters
    }

    #[inline]
    pub fn inches(&self) -> f64 {
        self.meters / METERS_PER_INCH
    }
}

/// Planar angle [rad].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    #[inline]
    pub const fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    #[inline]
    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees / DEGREES_PER_RADIAN)
    }

    #[inline]
    pub const fn radians(&self) -> f64 {
        self.radians
    }

    #[inline]
    pub fn degrees(&self) -> f64 {
        self.radians * DEGREES_PER_RADIAN
    }
}

/// Linear velocity [m/s].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct LinearVelocity {
    meters_per_second: f64,
}

impl LinearVelocity {
    #[inline]
    pub const fn from_meters_per_second(meters_per_second: f64) -> Self {
        Self { meters_per_second }
    }

    #[inline]
    pub fn from_feet_per_second(feet_per_second: f64) -> Self {
        Self::from_meters_per_second(feet_per_second * METERS_PER_FOOT)
    }

    #[inline]
    pub const fn meters_per_second(&self) -> f64 {
        self.meters_per_second
    }
}

/// Angular velocity [rad/s].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct AngularVelocity {
    radians_per_second: f64,
}

impl AngularVelocity {
    #[inline]
    pub const fn from_radians_per_second(radians_per_second: f64) -> Self {
        Self { radians_per_second }
    }

    #[inline]
    pub fn from_degrees_per_second(degrees_per_second: f64) -> Self {
        Self::from_radians_per_second(degrees_per_second / DEGREES_PER_RADIAN)
    }

    #[inline]
    pub const fn radians_per_second(&self) -> f64 {
        self.radians_per_second
    }

    #[inline]
    pub fn degrees_per_second(&self) -> f64 {
        self.radians_per_second * DEGREES_PER_RADIAN
    }
}

/// 2-D pose: field position plus heading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub x: Length,
    pub y: Length,
    pub heading: Angle,
}

impl Pose2d {
    pub const fn new(x: Length, y: Length, heading: Angle) -> Self {
        Self { x, y, heading }
    }

    /// Straight-line distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose2d) -> Length {
        let dx = other.x.meters() - self.x.meters();
        let dy = other.y.meters() - self.y.meters();
        Length::from_meters(dx.hypot(dy))
    }
}

// ─── Payload Kind ───────────────────────────────────────────────────

/// Tag naming which [`Payload`] variant a topic carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PayloadKind {
    Int = 0,
    Float = 1,
    Bool = 2,
    Length = 3,
    Angle = 4,
    LinearVelocity = 5,
    AngularVelocity = 6,
    Pose = 7,
}

impl PayloadKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Length => "length",
            Self::Angle => "angle",
            Self::LinearVelocity => "linear_velocity",
            Self::AngularVelocity => "angular_velocity",
            Self::Pose => "pose",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Payload ────────────────────────────────────────────────────────

/// A single state-change value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Int(i32),
    Float(f64),
    Bool(bool),
    Length(Length),
    Angle(Angle),
    LinearVelocity(LinearVelocity),
    AngularVelocity(AngularVelocity),
    Pose(Pose2d),
}

impl Payload {
    /// The kind tag of this value.
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::Int(_) => PayloadKind::Int,
            Self::Float(_) => PayloadKind::Float,
            Self::Bool(_) => PayloadKind::Bool,
            Self::Length(_) => PayloadKind::Length,
            Self::Angle(_) => PayloadKind::Angle,
            Self::LinearVelocity(_) => PayloadKind::LinearVelocity,
            Self::AngularVelocity(_) => PayloadKind::AngularVelocity,
            Self::Pose(_) => PayloadKind::Pose,
        }
    }

    /// Extract the value as `T` if the kinds agree.
    #[inline]
    pub fn get<T: PayloadValue>(&self) -> Option<T> {
        T::from_payload(self)
    }
}

/// Rust types that map one-to-one onto a [`PayloadKind`].
///
/// Implemented for every payload kind; used by `TypedTopic<T>` to bind a
/// topic to its value type at compile time.
pub trait PayloadValue: Copy + Into<Payload> {
    /// Kind tag produced by `Into<Payload>`.
    const KIND: PayloadKind;

    /// Unwrap a payload of the matching kind.
    fn from_payload(payload: &Payload) -> Option<Self>;
}

macro_rules! payload_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Payload {
            #[inline]
            fn from(value: $ty) -> Self {
                Payload::$variant(value)
            }
        }

        impl PayloadValue for $ty {
            const KIND: PayloadKind = PayloadKind::$variant;

            #[inline]
            fn from_payload(payload: &Payload) -> Option<Self> {
                match payload {
                    Payload::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

payload_value!(i32, Int);
payload_value!(f64, Float);
payload_value!(bool, Bool);
payload_value!(Length, Length);
payload_value!(Angle, Angle);
payload_value!(LinearVelocity, LinearVelocity);
payload_value!(AngularVelocity, AngularVelocity);
payload_value!(Pose2d, Pose);

// ─── Tests ──────────────────────────────────────────────────────────
