//! Conversions between the glam types of the public API and the nalgebra
//! types rapier works in.

use glam::{DVec3, Quat, Vec3};
use rapier3d::na::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

pub(crate) fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn to_point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

pub(crate) fn from_vector(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn to_rotation(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn from_rotation(q: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub(crate) fn to_isometry(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(position.x, position.y, position.z),
        to_rotation(rotation),
    )
}

/// Location vectors are doubles at the boundary; rapier is built single
/// precision.
pub(crate) fn location_to_isometry(position: DVec3, rotation: Quat) -> Isometry3<f32> {
    to_isometry(position.as_vec3(), rotation)
}

pub(crate) fn isometry_translation(iso: &Isometry3<f32>) -> DVec3 {
    let t = &iso.translation.vector;
    DVec3::new(t.x as f64, t.y as f64, t.z as f64)
}
