//! Two-body constraints.
//!
//! Settings describe a constraint in world or body-local terms; creating a
//! [`Constraint`] from them resolves both attachment frames against the
//! current body poses. The physics system turns enabled constraints into
//! rapier impulse joints.

use std::fmt;

use glam::{DVec3, Quat};
use parking_lot::Mutex;
use rapier3d::na::Isometry3;
use rapier3d::prelude::{GenericJoint, GenericJointBuilder, JointAxesMask};

use crate::engine::body::{Body, BodyId};
use crate::engine::math;
use crate::engine::refcount::Ref;
use crate::types::{ConstraintSpace, ConstraintSubType, ConstraintType};

/// Geometry of a constraint, per sub type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Removes all relative motion.
    Fixed {
        space: ConstraintSpace,
        /// Use the midpoint between the two bodies instead of the points.
        auto_detect_point: bool,
        point1: DVec3,
        point2: DVec3,
    },
    /// Keeps one point of each body together.
    Point {
        space: ConstraintSpace,
        point1: DVec3,
        point2: DVec3,
    },
}

impl ConstraintKind {
    pub fn sub_type(&self) -> ConstraintSubType {
        match self {
            ConstraintKind::Fixed { .. } => ConstraintSubType::Fixed,
            ConstraintKind::Point { .. } => ConstraintSubType::Point,
        }
    }
}

/// Settings shared by every constraint kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintParams {
    pub enabled: bool,
    pub constraint_priority: u32,
    pub num_velocity_steps_override: u32,
    pub num_position_steps_override: u32,
    pub user_data: u64,
    pub kind: ConstraintKind,
}

impl ConstraintParams {
    fn new(kind: ConstraintKind) -> Self {
        Self {
            enabled: true,
            constraint_priority: 0,
            num_velocity_steps_override: 0,
            num_position_steps_override: 0,
            user_data: 0,
            kind,
        }
    }
}

/// Reference-counted, editable constraint settings.
pub struct ConstraintSettings {
    params: Mutex<ConstraintParams>,
}

impl ConstraintSettings {
    pub fn new(params: ConstraintParams) -> Self {
        Self {
            params: Mutex::new(params),
        }
    }

    pub fn fixed() -> Self {
        Self::new(ConstraintParams::new(ConstraintKind::Fixed {
            space: ConstraintSpace::WorldSpace,
            auto_detect_point: false,
            point1: DVec3::ZERO,
            point2: DVec3::ZERO,
        }))
    }

    pub fn point() -> Self {
        Self::new(ConstraintParams::new(ConstraintKind::Point {
            space: ConstraintSpace::WorldSpace,
            point1: DVec3::ZERO,
            point2: DVec3::ZERO,
        }))
    }

    pub fn sub_type(&self) -> ConstraintSubType {
        self.params.lock().kind.sub_type()
    }

    /// A snapshot of the current settings.
    pub fn params(&self) -> ConstraintParams {
        self.params.lock().clone()
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut ConstraintParams) -> R) -> R {
        f(&mut self.params.lock())
    }

    /// Build a constraint between two bodies in their current poses.
    ///
    /// The constraint still has to be added to a physics system.
    pub fn create(&self, body1: &Body, body2: &Body) -> Constraint {
        let params = self.params();
        let pose1 = *body1.rigid_body().position();
        let pose2 = *body2.rigid_body().position();

        let (space, point1, point2) = match &params.kind {
            ConstraintKind::Fixed {
                auto_detect_point: true,
                ..
            } => {
                let mid = (body1.position() + body2.position()) * 0.5;
                (ConstraintSpace::WorldSpace, mid, mid)
            }
            ConstraintKind::Fixed {
                space,
                point1,
                point2,
                ..
            }
            | ConstraintKind::Point {
                space,
                point1,
                point2,
            } => (*space, *point1, *point2),
        };
        let (frame1, frame2) = match space {
            ConstraintSpace::WorldSpace => (
                local_frame(&pose1, point1),
                local_frame(&pose2, point2),
            ),
            ConstraintSpace::LocalToBodyCom => (
                math::location_to_isometry(point1, Quat::IDENTITY),
                math::location_to_isometry(point2, Quat::IDENTITY),
            ),
        };

        Constraint {
            sub_type: params.kind.sub_type(),
            body1: body1.id(),
            body2: body2.id(),
            frame1,
            frame2,
            state: Mutex::new(ConstraintState {
                enabled: params.enabled,
                constraint_priority: params.constraint_priority,
                num_velocity_steps_override: params.num_velocity_steps_override,
                num_position_steps_override: params.num_position_steps_override,
                user_data: params.user_data,
            }),
        }
    }
}

impl fmt::Debug for ConstraintSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConstraintSettings").field(&*self.params.lock()).finish()
    }
}

/// A world-space point with world axes, expressed relative to `pose`.
fn local_frame(pose: &Isometry3<f32>, world_point: DVec3) -> Isometry3<f32> {
    pose.inverse() * math::location_to_isometry(world_point, Quat::IDENTITY)
}

#[derive(Debug, Clone)]
struct ConstraintState {
    enabled: bool,
    constraint_priority: u32,
    num_velocity_steps_override: u32,
    num_position_steps_override: u32,
    user_data: u64,
}

/// A constraint between two bodies.
pub struct Constraint {
    sub_type: ConstraintSubType,
    body1: BodyId,
    body2: BodyId,
    frame1: Isometry3<f32>,
    frame2: Isometry3<f32>,
    state: Mutex<ConstraintState>,
}

impl Constraint {
    pub fn constraint_type(&self) -> ConstraintType {
        ConstraintType::TwoBodyConstraint
    }

    pub fn sub_type(&self) -> ConstraintSubType {
        self.sub_type
    }

    pub fn body1(&self) -> BodyId {
        self.body1
    }

    pub fn body2(&self) -> BodyId {
        self.body2
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Takes effect on the next physics update.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    pub fn constraint_priority(&self) -> u32 {
        self.state.lock().constraint_priority
    }

    pub fn set_constraint_priority(&self, priority: u32) {
        self.state.lock().constraint_priority = priority;
    }

    pub fn num_velocity_steps_override(&self) -> u32 {
        self.state.lock().num_velocity_steps_override
    }

    pub fn set_num_velocity_steps_override(&self, steps: u32) {
        self.state.lock().num_velocity_steps_override = steps;
    }

    pub fn num_position_steps_override(&self) -> u32 {
        self.state.lock().num_position_steps_override
    }

    pub fn set_num_position_steps_override(&self, steps: u32) {
        self.state.lock().num_position_steps_override = steps;
    }

    pub fn user_data(&self) -> u64 {
        self.state.lock().user_data
    }

    pub fn set_user_data(&self, user_data: u64) {
        self.state.lock().user_data = user_data;
    }

    /// Attachment frame on the first body, relative to its origin.
    pub fn local_position1(&self) -> DVec3 {
        math::isometry_translation(&self.frame1)
    }

    /// Attachment frame on the second body, relative to its origin.
    pub fn local_position2(&self) -> DVec3 {
        math::isometry_translation(&self.frame2)
    }

    /// Settings reproducing this constraint, expressed in body-local space.
    pub fn settings(&self) -> Ref<ConstraintSettings> {
        let state = self.state.lock().clone();
        let point1 = self.local_position1();
        let point2 = self.local_position2();
        let kind = match self.sub_type {
            ConstraintSubType::Fixed => ConstraintKind::Fixed {
                space: ConstraintSpace::LocalToBodyCom,
                auto_detect_point: false,
                point1,
                point2,
            },
            ConstraintSubType::Point => ConstraintKind::Point {
                space: ConstraintSpace::LocalToBodyCom,
                point1,
                point2,
            },
        };
        Ref::new(ConstraintSettings::new(ConstraintParams {
            enabled: state.enabled,
            constraint_priority: state.constraint_priority,
            num_velocity_steps_override: state.num_velocity_steps_override,
            num_position_steps_override: state.num_position_steps_override,
            user_data: state.user_data,
            kind,
        }))
    }

    pub(crate) fn joint(&self) -> GenericJoint {
        let axes = match self.sub_type {
            ConstraintSubType::Fixed => JointAxesMask::LOCKED_FIXED_AXES,
            ConstraintSubType::Point => JointAxesMask::LOCKED_SPHERICAL_AXES,
        };
        let mut joint = GenericJointBuilder::new(axes).build();
        joint.local_frame1 = self.frame1;
        joint.local_frame2 = self.frame2;
        joint
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("sub_type", &self.sub_type)
            .field("body1", &self.body1)
            .field("body2", &self.body2)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
