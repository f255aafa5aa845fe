//! Type definitions and enums.
//!
//! Enums cross the C boundary as `i32` ordinals. Ordinals are stable and
//! follow declaration order.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Implements the ordinal conversions for a fieldless enum.
macro_rules! ordinal_enum {
    ($name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                match value {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = Error;

            fn try_from(ordinal: i32) -> Result<Self, Error> {
                match ordinal {
                    $($value => Ok($name::$variant),)+
                    other => Err(Error::InvalidArgument(format!(
                        "{} is not a valid {} ordinal",
                        other,
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

/// How a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionType {
    /// Never moves.
    Static,
    /// Moved by velocities only, not by forces.
    Kinematic,
    /// Fully simulated.
    #[default]
    Dynamic,
}

ordinal_enum!(MotionType { Static = 0, Kinematic = 1, Dynamic = 2 });

/// Motion quality, i.e. whether continuous collision detection is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionQuality {
    /// Discrete collision detection.
    #[default]
    Discrete,
    /// Continuous collision detection along the linear motion.
    LinearCast,
}

ordinal_enum!(MotionQuality { Discrete = 0, LinearCast = 1 });

/// How the mass properties of a body are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverrideMassProperties {
    /// Mass and inertia are computed from the shape.
    #[default]
    CalculateMassAndInertia,
    /// Mass is provided, inertia is computed from the shape.
    CalculateInertia,
    /// Mass and inertia are provided.
    MassAndInertiaProvided,
}

ordinal_enum!(OverrideMassProperties {
    CalculateMassAndInertia = 0,
    CalculateInertia = 1,
    MassAndInertiaProvided = 2,
});

/// Broad classification of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    /// Convex primitive.
    Convex,
    /// Collection of sub-shapes.
    Compound,
}

ordinal_enum!(ShapeType { Convex = 0, Compound = 1 });

/// Concrete kind of a shape.
///
/// Ordinals leave room for kinds the bindings do not construct, so that
/// hosts can share one ordinal table with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeSubType {
    /// Sphere.
    Sphere,
    /// Box, optionally with rounded edges.
    Box,
    /// Single triangle (not constructible).
    Triangle,
    /// Capsule aligned with the Y axis.
    Capsule,
    /// Tapered capsule (not constructible).
    TaperedCapsule,
    /// Cylinder (not constructible).
    Cylinder,
    /// Convex hull of a point cloud.
    ConvexHull,
    /// Immutable compound.
    StaticCompound,
    /// Compound that can be edited after creation.
    MutableCompound,
}

ordinal_enum!(ShapeSubType {
    Sphere = 0,
    Box = 1,
    Triangle = 2,
    Capsule = 3,
    TaperedCapsule = 4,
    Cylinder = 5,
    ConvexHull = 6,
    StaticCompound = 7,
    MutableCompound = 8,
});

impl ShapeSubType {
    /// The broad classification of this kind.
    pub fn shape_type(self) -> ShapeType {
        match self {
            ShapeSubType::StaticCompound | ShapeSubType::MutableCompound => ShapeType::Compound,
            _ => ShapeType::Convex,
        }
    }
}

/// Broad classification of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Constraint not attached to bodies.
    Constraint,
    /// Constraint between two bodies.
    TwoBodyConstraint,
}

ordinal_enum!(ConstraintType { Constraint = 0, TwoBodyConstraint = 1 });

/// Concrete kind of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSubType {
    /// Removes all relative degrees of freedom.
    Fixed,
    /// Ball-and-socket.
    Point,
}

ordinal_enum!(ConstraintSubType { Fixed = 0, Point = 1 });

/// Space in which constraint points are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstraintSpace {
    /// Relative to the center of mass of each body.
    LocalToBodyCom,
    /// World coordinates.
    #[default]
    WorldSpace,
}

ordinal_enum!(ConstraintSpace { LocalToBodyCom = 0, WorldSpace = 1 });

/// Whether adding a body also wakes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Wake the body.
    #[default]
    Activate,
    /// Leave the body asleep.
    DontActivate,
}

ordinal_enum!(Activation { Activate = 0, DontActivate = 1 });

/// Encoding of an object stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamType {
    /// Human-readable JSON.
    #[default]
    Text,
    /// Compact binary.
    Binary,
}

ordinal_enum!(StreamType { Text = 0, Binary = 1 });
