//! Body identifiers and the read view over a simulated body.

use std::fmt;

use glam::{DVec3, Quat, Vec3};
use rapier3d::prelude::{RigidBody, RigidBodyType};

use crate::engine::math;
use crate::types::MotionType;

/// Identifies a body inside one physics system.
///
/// Packs a 23 bit slot index with an 8 bit sequence number that changes each
/// time the slot is reused, so stale identifiers do not alias new bodies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BodyId(u32);

impl BodyId {
    pub const INVALID: BodyId = BodyId(0xffff_ffff);
    pub const MAX_INDEX: u32 = 0x007f_ffff;
    const SEQUENCE_SHIFT: u32 = 24;

    pub fn new(index: u32, sequence: u8) -> Self {
        assert!(index <= Self::MAX_INDEX, "body index {} out of range", index);
        BodyId(index | ((sequence as u32) << Self::SEQUENCE_SHIFT))
    }

    pub fn from_raw(raw: u32) -> Self {
        BodyId(raw)
    }

    /// Index and sequence number in one integer.
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> u32 {
        self.0 & Self::MAX_INDEX
    }

    pub fn sequence(self) -> u8 {
        (self.0 >> Self::SEQUENCE_SHIFT) as u8
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl Default for BodyId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "BodyId(invalid)")
        } else {
            write!(f, "BodyId({}#{})", self.index(), self.sequence())
        }
    }
}

// Layout of the 128 bit user data rapier keeps on every rigid body.
const USER_DATA_MASK: u128 = 0xffff_ffff_ffff_ffff;
const LAYER_SHIFT: u32 = 64;
const ID_SHIFT: u32 = 80;
const SENSOR_BIT: u128 = 1 << 112;

pub(crate) fn pack_user_data(id: BodyId, object_layer: u16, user_data: u64, is_sensor: bool) -> u128 {
    let mut packed = user_data as u128
        | (object_layer as u128) << LAYER_SHIFT
        | (id.raw() as u128) << ID_SHIFT;
    if is_sensor {
        packed |= SENSOR_BIT;
    }
    packed
}

/// A simulated body, viewed through the rigid body that backs it.
#[repr(transparent)]
pub struct Body(RigidBody);

impl Body {
    pub(crate) fn from_rigid_body(body: &RigidBody) -> &Body {
        // SAFETY: Body is a transparent wrapper around RigidBody.
        unsafe { &*(body as *const RigidBody as *const Body) }
    }

    pub(crate) fn from_rigid_body_mut(body: &mut RigidBody) -> &mut Body {
        // SAFETY: as above.
        unsafe { &mut *(body as *mut RigidBody as *mut Body) }
    }

    pub(crate) fn rigid_body(&self) -> &RigidBody {
        &self.0
    }

    pub fn id(&self) -> BodyId {
        BodyId((self.0.user_data >> ID_SHIFT) as u32)
    }

    pub fn user_data(&self) -> u64 {
        (self.0.user_data & USER_DATA_MASK) as u64
    }

    pub fn set_user_data(&mut self, user_data: u64) {
        self.0.user_data = (self.0.user_data & !USER_DATA_MASK) | user_data as u128;
    }

    pub fn object_layer(&self) -> u16 {
        (self.0.user_data >> LAYER_SHIFT) as u16
    }

    pub fn is_sensor(&self) -> bool {
        self.0.user_data & SENSOR_BIT != 0
    }

    /// Whether the body takes part in the simulation and in queries.
    pub fn is_in_broad_phase(&self) -> bool {
        self.0.is_enabled()
    }

    pub fn is_active(&self) -> bool {
        self.is_in_broad_phase() && !self.0.is_sleeping() && !self.is_static()
    }

    pub fn motion_type(&self) -> MotionType {
        match self.0.body_type() {
            RigidBodyType::Fixed => MotionType::Static,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                MotionType::Kinematic
            }
            RigidBodyType::Dynamic => MotionType::Dynamic,
        }
    }

    pub fn is_static(&self) -> bool {
        self.motion_type() == MotionType::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.motion_type() == MotionType::Dynamic
    }

    pub fn is_kinematic(&self) -> bool {
        self.motion_type() == MotionType::Kinematic
    }

    pub fn position(&self) -> DVec3 {
        math::isometry_translation(self.0.position())
    }

    pub fn rotation(&self) -> Quat {
        math::from_rotation(&self.0.position().rotation)
    }

    pub fn center_of_mass_position(&self) -> DVec3 {
        math::from_point(self.0.center_of_mass()).as_dvec3()
    }

    pub fn linear_velocity(&self) -> Vec3 {
        math::from_vector(self.0.linvel())
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.0.set_linvel(math::to_vector(velocity), true);
    }

    pub fn angular_velocity(&self) -> Vec3 {
        math::from_vector(self.0.angvel())
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.0.set_angvel(math::to_vector(velocity), true);
    }

    pub fn gravity_factor(&self) -> f32 {
        self.0.gravity_scale()
    }

    pub fn mass(&self) -> f32 {
        self.0.mass()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("id", &self.id())
            .field("motion_type", &self.motion_type())
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::RigidBodyBuilder;

    #[test]
    fn test_body_id_parts() {
        let id = BodyId::new(0x12345, 7);
        assert_eq!(id.index(), 0x12345);
        assert_eq!(id.sequence(), 7);
        assert_eq!(BodyId::from_raw(id.raw()), id);
        assert!(BodyId::default().is_invalid());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_body_id_index_overflow() {
        BodyId::new(BodyId::MAX_INDEX + 1, 0);
    }

    #[test]
    fn test_user_data_packing() {
        let id = BodyId::new(42, 3);
        let mut rigid = RigidBodyBuilder::dynamic()
            .user_data(pack_user_data(id, 9, u64::MAX - 1, true))
            .build();
        let body = Body::from_rigid_body_mut(&mut rigid);
        assert_eq!(body.id(), id);
        assert_eq!(body.object_layer(), 9);
        assert_eq!(body.user_data(), u64::MAX - 1);
        assert!(body.is_sensor());

        body.set_user_data(5);
        assert_eq!(body.user_data(), 5);
        assert_eq!(body.id(), id);
        assert_eq!(body.object_layer(), 9);
    }
}
