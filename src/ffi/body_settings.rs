//! Exported functions for body creation settings.

use glam::{DVec3, Quat, Vec3};

use crate::engine::{BodyCreationSettings, RefConst};
use crate::ffi::buffer::{store_dvec3, store_quat, store_vec3};
use crate::ffi::handles::*;
use crate::ffi::ordinal;
use crate::types::{MotionQuality, MotionType, OverrideMassProperties};

// ============================================================================
// Lifecycle
// ============================================================================

/// Settings with engine defaults and no shape.
#[no_mangle]
pub extern "C" fn rphys_body_creation_settings_create_default() -> RphysBodyCreationSettings {
    RphysBodyCreationSettings::new_owned(BodyCreationSettings::default())
}

/// A copy of `settings`, sharing its shape.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_create_copy(
    settings: RphysBodyCreationSettings,
) -> RphysBodyCreationSettings {
    RphysBodyCreationSettings::new_owned(unsafe { settings.get() }.clone())
}

/// Settings for a body using `shape`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_body_creation_settings_create_from_shape(
    shape: RphysShape,
    x: f64,
    y: f64,
    z: f64,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
    motion_type: i32,
    object_layer: u16,
) -> RphysBodyCreationSettings {
    let shape = RefConst::from_ref(unsafe { shape.get() });
    RphysBodyCreationSettings::new_owned(BodyCreationSettings::from_shape(
        shape,
        DVec3::new(x, y, z),
        Quat::from_xyzw(rx, ry, rz, rw),
        ordinal::<MotionType>(motion_type),
        object_layer,
    ))
}

/// Settings for a body whose shape is created from `shape_settings`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_body_creation_settings_create_from_shape_settings(
    shape_settings: RphysShapeSettings,
    x: f64,
    y: f64,
    z: f64,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
    motion_type: i32,
    object_layer: u16,
) -> RphysBodyCreationSettings {
    let shape_settings = RefConst::from_ref(unsafe { shape_settings.get() });
    RphysBodyCreationSettings::new_owned(BodyCreationSettings::from_shape_settings(
        shape_settings,
        DVec3::new(x, y, z),
        Quat::from_xyzw(rx, ry, rz, rw),
        ordinal::<MotionType>(motion_type),
        object_layer,
    ))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_free(settings: RphysBodyCreationSettings) {
    unsafe { settings.free() }
}

// ============================================================================
// Vector properties
// ============================================================================

/// # Safety
///
/// `out` must be valid for `capacity` doubles.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_position(
    settings: RphysBodyCreationSettings,
    out: *mut f64,
    capacity: usize,
) {
    store_dvec3(out, capacity, settings.get().position);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_position(
    settings: RphysBodyCreationSettings,
    x: f64,
    y: f64,
    z: f64,
) {
    unsafe { settings.get_mut() }.position = DVec3::new(x, y, z);
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_rotation(
    settings: RphysBodyCreationSettings,
    out: *mut f32,
    capacity: usize,
) {
    store_quat(out, capacity, settings.get().rotation);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_rotation(
    settings: RphysBodyCreationSettings,
    x: f32,
    y: f32,
    z: f32,
    w: f32,
) {
    unsafe { settings.get_mut() }.rotation = Quat::from_xyzw(x, y, z, w);
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_linear_velocity(
    settings: RphysBodyCreationSettings,
    out: *mut f32,
    capacity: usize,
) {
    store_vec3(out, capacity, settings.get().linear_velocity);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_linear_velocity(
    settings: RphysBodyCreationSettings,
    x: f32,
    y: f32,
    z: f32,
) {
    unsafe { settings.get_mut() }.linear_velocity = Vec3::new(x, y, z);
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_angular_velocity(
    settings: RphysBodyCreationSettings,
    out: *mut f32,
    capacity: usize,
) {
    store_vec3(out, capacity, settings.get().angular_velocity);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_angular_velocity(
    settings: RphysBodyCreationSettings,
    x: f32,
    y: f32,
    z: f32,
) {
    unsafe { settings.get_mut() }.angular_velocity = Vec3::new(x, y, z);
}

// ============================================================================
// Scalar properties
// ============================================================================

macro_rules! scalar_property {
    ($get:ident, $set:ident, $field:ident: $ty:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get(settings: RphysBodyCreationSettings) -> $ty {
            unsafe { settings.get() }.$field
        }

        #[no_mangle]
        pub unsafe extern "C" fn $set(settings: RphysBodyCreationSettings, value: $ty) {
            unsafe { settings.get_mut() }.$field = value;
        }
    };
}

macro_rules! ordinal_property {
    ($get:ident, $set:ident, $field:ident: $ty:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get(settings: RphysBodyCreationSettings) -> i32 {
            unsafe { settings.get() }.$field.into()
        }

        #[no_mangle]
        pub unsafe extern "C" fn $set(settings: RphysBodyCreationSettings, value: i32) {
            unsafe { settings.get_mut() }.$field = ordinal::<$ty>(value);
        }
    };
}

scalar_property!(
    rphys_body_creation_settings_get_user_data,
    rphys_body_creation_settings_set_user_data,
    user_data: u64
);
scalar_property!(
    rphys_body_creation_settings_get_object_layer,
    rphys_body_creation_settings_set_object_layer,
    object_layer: u16
);
scalar_property!(
    rphys_body_creation_settings_get_allow_sleeping,
    rphys_body_creation_settings_set_allow_sleeping,
    allow_sleeping: bool
);
scalar_property!(
    rphys_body_creation_settings_get_allow_dynamic_or_kinematic,
    rphys_body_creation_settings_set_allow_dynamic_or_kinematic,
    allow_dynamic_or_kinematic: bool
);
scalar_property!(
    rphys_body_creation_settings_get_is_sensor,
    rphys_body_creation_settings_set_is_sensor,
    is_sensor: bool
);
scalar_property!(
    rphys_body_creation_settings_get_friction,
    rphys_body_creation_settings_set_friction,
    friction: f32
);
scalar_property!(
    rphys_body_creation_settings_get_restitution,
    rphys_body_creation_settings_set_restitution,
    restitution: f32
);
scalar_property!(
    rphys_body_creation_settings_get_linear_damping,
    rphys_body_creation_settings_set_linear_damping,
    linear_damping: f32
);
scalar_property!(
    rphys_body_creation_settings_get_angular_damping,
    rphys_body_creation_settings_set_angular_damping,
    angular_damping: f32
);
scalar_property!(
    rphys_body_creation_settings_get_max_linear_velocity,
    rphys_body_creation_settings_set_max_linear_velocity,
    max_linear_velocity: f32
);
scalar_property!(
    rphys_body_creation_settings_get_max_angular_velocity,
    rphys_body_creation_settings_set_max_angular_velocity,
    max_angular_velocity: f32
);
scalar_property!(
    rphys_body_creation_settings_get_gravity_factor,
    rphys_body_creation_settings_set_gravity_factor,
    gravity_factor: f32
);
scalar_property!(
    rphys_body_creation_settings_get_inertia_multiplier,
    rphys_body_creation_settings_set_inertia_multiplier,
    inertia_multiplier: f32
);
scalar_property!(
    rphys_body_creation_settings_get_mass_override,
    rphys_body_creation_settings_set_mass_override,
    mass_override: f32
);
scalar_property!(
    rphys_body_creation_settings_get_num_velocity_steps_override,
    rphys_body_creation_settings_set_num_velocity_steps_override,
    num_velocity_steps_override: u32
);
scalar_property!(
    rphys_body_creation_settings_get_num_position_steps_override,
    rphys_body_creation_settings_set_num_position_steps_override,
    num_position_steps_override: u32
);
ordinal_property!(
    rphys_body_creation_settings_get_motion_type,
    rphys_body_creation_settings_set_motion_type,
    motion_type: MotionType
);
ordinal_property!(
    rphys_body_creation_settings_get_motion_quality,
    rphys_body_creation_settings_set_motion_quality,
    motion_quality: MotionQuality
);
ordinal_property!(
    rphys_body_creation_settings_get_override_mass_properties,
    rphys_body_creation_settings_set_override_mass_properties,
    override_mass_properties: OverrideMassProperties
);

// ============================================================================
// Shape
// ============================================================================

/// The shape, as a non-owning handle, or null.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_shape(settings: RphysBodyCreationSettings) -> RphysShape {
    unsafe { settings.get() }
        .shape()
        .map_or(RphysShape::invalid(), |shape| RphysShape::from_ptr(shape.as_ptr()))
}

/// Use `shape`; null clears it. Drops any shape settings.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_shape(
    settings: RphysBodyCreationSettings,
    shape: RphysShape,
) {
    let shape = shape
        .is_valid()
        .then(|| RefConst::from_ref(unsafe { shape.get() }));
    unsafe { settings.get_mut() }.set_shape(shape);
}

/// The shape settings, as a non-owning handle, or null.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_get_shape_settings(
    settings: RphysBodyCreationSettings,
) -> RphysShapeSettings {
    unsafe { settings.get() }
        .shape_settings()
        .map_or(RphysShapeSettings::invalid(), |s| RphysShapeSettings::from_ptr(s.as_ptr()))
}

/// Use `shape_settings`; null clears them. Drops any shape.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_set_shape_settings(
    settings: RphysBodyCreationSettings,
    shape_settings: RphysShapeSettings,
) {
    let shape_settings = shape_settings
        .is_valid()
        .then(|| RefConst::from_ref(unsafe { shape_settings.get() }));
    unsafe { settings.get_mut() }.set_shape_settings(shape_settings);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_has_mass_properties(settings: RphysBodyCreationSettings) -> bool {
    unsafe { settings.get() }.has_mass_properties()
}

/// Turn the shape settings into a shape. The caller frees the result.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_convert_shape_settings(
    settings: RphysBodyCreationSettings,
) -> RphysShapeResult {
    RphysShapeResult::new_owned(unsafe { settings.get_mut() }.convert_shape_settings())
}

// ============================================================================
// Binary state
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_save_binary_state(
    settings: RphysBodyCreationSettings,
    stream: RphysStreamOut,
) {
    unsafe { settings.get() }.save_binary_state(unsafe { stream.get_mut() });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_creation_settings_restore_binary_state(
    settings: RphysBodyCreationSettings,
    stream: RphysStreamIn,
) {
    unsafe { settings.get_mut() }.restore_binary_state(unsafe { stream.get_mut() });
}
