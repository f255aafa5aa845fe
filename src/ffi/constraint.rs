//! Exported functions for constraint settings and constraints.
//!
//! Settings and constraints come back from their `create` functions with a
//! reference count of zero; take a `Ref` or add the constraint to a physics
//! system to keep them alive.

use glam::DVec3;

use crate::engine::{ConstraintKind, ConstraintSettings, RefTarget};
use crate::ffi::buffer::store_dvec3;
use crate::ffi::handles::*;
use crate::ffi::ordinal;
use crate::types::ConstraintSpace;

fn new_settings(settings: ConstraintSettings) -> RphysConstraintSettings {
    RphysConstraintSettings::from_ptr(RefTarget::new(settings).as_ptr())
}

fn settings_of<'a>(settings: RphysConstraintSettings) -> &'a ConstraintSettings {
    unsafe { settings.get() }.get()
}

// ============================================================================
// ConstraintSettings
// ============================================================================

/// Fixed constraint settings in world space, points at the origin.
#[no_mangle]
pub extern "C" fn rphys_fixed_constraint_settings_create() -> RphysConstraintSettings {
    new_settings(ConstraintSettings::fixed())
}

/// Point constraint settings in world space, points at the origin.
#[no_mangle]
pub extern "C" fn rphys_point_constraint_settings_create() -> RphysConstraintSettings {
    new_settings(ConstraintSettings::point())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_settings_get_sub_type(settings: RphysConstraintSettings) -> i32 {
    settings_of(settings).sub_type().into()
}

/// Generates a getter/setter pair for a field shared by all settings.
macro_rules! settings_property {
    ($get:ident, $set:ident, $field:ident: $ty:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get(settings: RphysConstraintSettings) -> $ty {
            settings_of(settings).params().$field
        }

        #[no_mangle]
        pub unsafe extern "C" fn $set(settings: RphysConstraintSettings, value: $ty) {
            settings_of(settings).edit(|params| params.$field = value);
        }
    };
}

settings_property!(
    rphys_constraint_settings_get_enabled,
    rphys_constraint_settings_set_enabled,
    enabled: bool
);
settings_property!(
    rphys_constraint_settings_get_constraint_priority,
    rphys_constraint_settings_set_constraint_priority,
    constraint_priority: u32
);
settings_property!(
    rphys_constraint_settings_get_num_velocity_steps_override,
    rphys_constraint_settings_set_num_velocity_steps_override,
    num_velocity_steps_override: u32
);
settings_property!(
    rphys_constraint_settings_get_num_position_steps_override,
    rphys_constraint_settings_set_num_position_steps_override,
    num_position_steps_override: u32
);
settings_property!(
    rphys_constraint_settings_get_user_data,
    rphys_constraint_settings_set_user_data,
    user_data: u64
);

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_get_space(settings: RphysConstraintSettings) -> i32 {
    match settings_of(settings).params().kind {
        ConstraintKind::Fixed { space, .. } | ConstraintKind::Point { space, .. } => space.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_set_space(settings: RphysConstraintSettings, space: i32) {
    let value: ConstraintSpace = ordinal(space);
    settings_of(settings).edit(|params| match &mut params.kind {
        ConstraintKind::Fixed { space, .. } | ConstraintKind::Point { space, .. } => *space = value,
    });
}

fn points(settings: RphysConstraintSettings) -> (DVec3, DVec3) {
    match settings_of(settings).params().kind {
        ConstraintKind::Fixed { point1, point2, .. } | ConstraintKind::Point { point1, point2, .. } => {
            (point1, point2)
        }
    }
}

/// # Safety
///
/// `out` must be valid for `capacity` doubles.
#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_get_point1(
    settings: RphysConstraintSettings,
    out: *mut f64,
    capacity: usize,
) {
    store_dvec3(out, capacity, points(settings).0);
}

/// # Safety
///
/// `out` must be valid for `capacity` doubles.
#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_get_point2(
    settings: RphysConstraintSettings,
    out: *mut f64,
    capacity: usize,
) {
    store_dvec3(out, capacity, points(settings).1);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_set_point1(
    settings: RphysConstraintSettings,
    x: f64,
    y: f64,
    z: f64,
) {
    settings_of(settings).edit(|params| match &mut params.kind {
        ConstraintKind::Fixed { point1, .. } | ConstraintKind::Point { point1, .. } => {
            *point1 = DVec3::new(x, y, z)
        }
    });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_set_point2(
    settings: RphysConstraintSettings,
    x: f64,
    y: f64,
    z: f64,
) {
    settings_of(settings).edit(|params| match &mut params.kind {
        ConstraintKind::Fixed { point2, .. } | ConstraintKind::Point { point2, .. } => {
            *point2 = DVec3::new(x, y, z)
        }
    });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_fixed_constraint_settings_get_auto_detect_point(
    settings: RphysConstraintSettings,
) -> bool {
    auto_detect_point(settings_of(settings))
}

fn auto_detect_point(settings: &ConstraintSettings) -> bool {
    match settings.params().kind {
        ConstraintKind::Fixed {
            auto_detect_point, ..
        } => auto_detect_point,
        other => panic!("not fixed constraint settings: {:?}", other),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_fixed_constraint_settings_set_auto_detect_point(
    settings: RphysConstraintSettings,
    value: bool,
) {
    settings_of(settings).edit(|params| match &mut params.kind {
        ConstraintKind::Fixed {
            auto_detect_point, ..
        } => *auto_detect_point = value,
        other => panic!("not fixed constraint settings: {:?}", other),
    });
}

/// Build a constraint between two bodies in their current poses. The
/// constraint starts unreferenced.
#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_settings_create(
    settings: RphysConstraintSettings,
    body1: RphysBody,
    body2: RphysBody,
) -> RphysConstraint {
    let constraint = settings_of(settings).create(unsafe { body1.get() }, unsafe { body2.get() });
    RphysConstraint::from_ptr(RefTarget::new(constraint).as_ptr())
}

export_ref!(RphysConstraintSettings, RphysConstraintSettingsRef {
    get_ref_count: rphys_constraint_settings_get_ref_count,
    set_embedded: rphys_constraint_settings_set_embedded,
    to_ref: rphys_constraint_settings_to_ref,
    copy: rphys_constraint_settings_ref_copy,
    free: rphys_constraint_settings_ref_free,
    get_ptr: rphys_constraint_settings_ref_get_ptr,
});

export_ref_c!(RphysConstraintSettings, RphysConstraintSettingsRef, RphysConstraintSettingsRefC {
    to_ref_c: rphys_constraint_settings_to_ref_c,
    ref_to_ref_c: rphys_constraint_settings_ref_to_ref_c,
    copy: rphys_constraint_settings_ref_c_copy,
    free: rphys_constraint_settings_ref_c_free,
    get_ptr: rphys_constraint_settings_ref_c_get_ptr,
});

// ============================================================================
// Constraint
// ============================================================================

fn constraint_of<'a>(constraint: RphysConstraint) -> &'a crate::engine::Constraint {
    unsafe { constraint.get() }.get()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_type(constraint: RphysConstraint) -> i32 {
    constraint_of(constraint).constraint_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_sub_type(constraint: RphysConstraint) -> i32 {
    constraint_of(constraint).sub_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_enabled(constraint: RphysConstraint) -> bool {
    constraint_of(constraint).is_enabled()
}

/// Takes effect at the next update of the owning system.
#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_set_enabled(constraint: RphysConstraint, enabled: bool) {
    constraint_of(constraint).set_enabled(enabled);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_constraint_priority(constraint: RphysConstraint) -> u32 {
    constraint_of(constraint).constraint_priority()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_set_constraint_priority(constraint: RphysConstraint, priority: u32) {
    constraint_of(constraint).set_constraint_priority(priority);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_num_velocity_steps_override(constraint: RphysConstraint) -> u32 {
    constraint_of(constraint).num_velocity_steps_override()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_set_num_velocity_steps_override(constraint: RphysConstraint, steps: u32) {
    constraint_of(constraint).set_num_velocity_steps_override(steps);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_num_position_steps_override(constraint: RphysConstraint) -> u32 {
    constraint_of(constraint).num_position_steps_override()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_set_num_position_steps_override(constraint: RphysConstraint, steps: u32) {
    constraint_of(constraint).set_num_position_steps_override(steps);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_user_data(constraint: RphysConstraint) -> u64 {
    constraint_of(constraint).user_data()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_set_user_data(constraint: RphysConstraint, user_data: u64) {
    constraint_of(constraint).set_user_data(user_data);
}

/// New settings reproducing the constraint, in body-local space.
#[no_mangle]
pub unsafe extern "C" fn rphys_constraint_get_constraint_settings(
    constraint: RphysConstraint,
) -> RphysConstraintSettingsRef {
    RphysConstraintSettingsRef::new_owned(constraint_of(constraint).settings())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_get_body1(constraint: RphysConstraint) -> u32 {
    constraint_of(constraint).body1().raw()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_two_body_constraint_get_body2(constraint: RphysConstraint) -> u32 {
    constraint_of(constraint).body2().raw()
}

export_ref!(RphysConstraint, RphysConstraintRef {
    get_ref_count: rphys_constraint_get_ref_count,
    set_embedded: rphys_constraint_set_embedded,
    to_ref: rphys_constraint_to_ref,
    copy: rphys_constraint_ref_copy,
    free: rphys_constraint_ref_free,
    get_ptr: rphys_constraint_ref_get_ptr,
});
