//! Exported functions for shape settings.
//!
//! `create` functions return a settings object nobody references yet; take
//! a `Ref` or `RefC` to own it.

use std::slice;

use glam::{Quat, Vec3};

use crate::engine::shape::{SettingsKind, SubShapeSource};
use crate::engine::{RefConst, RefTarget, ShapeSettings};
use crate::ffi::buffer::store_vec3;
use crate::ffi::handles::*;

fn new_settings(settings: ShapeSettings) -> RphysShapeSettings {
    RphysShapeSettings::from_ptr(RefTarget::new(settings).as_ptr())
}

// ============================================================================
// Creation
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_sphere_shape_settings_create(radius: f32) -> RphysShapeSettings {
    new_settings(ShapeSettings::sphere(radius))
}

#[no_mangle]
pub extern "C" fn rphys_box_shape_settings_create(
    hx: f32,
    hy: f32,
    hz: f32,
    convex_radius: f32,
) -> RphysShapeSettings {
    new_settings(ShapeSettings::cuboid(Vec3::new(hx, hy, hz), convex_radius))
}

#[no_mangle]
pub extern "C" fn rphys_capsule_shape_settings_create(half_height: f32, radius: f32) -> RphysShapeSettings {
    new_settings(ShapeSettings::capsule(half_height, radius))
}

/// Settings for the hull of `num_points` points, packed as x, y, z floats.
///
/// # Safety
///
/// `points` must be valid for `3 * num_points` reads.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_settings_create(
    points: *const f32,
    num_points: usize,
    max_convex_radius: f32,
) -> RphysShapeSettings {
    let points = if points.is_null() || num_points == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(points, num_points * 3)
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .collect()
    };
    new_settings(ShapeSettings::convex_hull(points, max_convex_radius))
}

#[no_mangle]
pub extern "C" fn rphys_static_compound_shape_settings_create() -> RphysShapeSettings {
    new_settings(ShapeSettings::static_compound())
}

#[no_mangle]
pub extern "C" fn rphys_mutable_compound_shape_settings_create() -> RphysShapeSettings {
    new_settings(ShapeSettings::mutable_compound())
}

// ============================================================================
// Common accessors
// ============================================================================

/// Create the shape, or return the result cached by an earlier call. The
/// caller frees the result.
#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_create_shape(settings: RphysShapeSettings) -> RphysShapeResult {
    RphysShapeResult::new_owned(unsafe { settings.get() }.create())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_clear_cached_result(settings: RphysShapeSettings) {
    unsafe { settings.get() }.clear_cached_result();
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_get_type(settings: RphysShapeSettings) -> i32 {
    unsafe { settings.get() }.shape_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_get_sub_type(settings: RphysShapeSettings) -> i32 {
    unsafe { settings.get() }.sub_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_get_user_data(settings: RphysShapeSettings) -> u64 {
    unsafe { settings.get() }.user_data()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_settings_set_user_data(settings: RphysShapeSettings, user_data: u64) {
    unsafe { settings.get() }.set_user_data(user_data);
}

export_ref!(RphysShapeSettings, RphysShapeSettingsRef {
    get_ref_count: rphys_shape_settings_get_ref_count,
    set_embedded: rphys_shape_settings_set_embedded,
    to_ref: rphys_shape_settings_to_ref,
    copy: rphys_shape_settings_ref_copy,
    free: rphys_shape_settings_ref_free,
    get_ptr: rphys_shape_settings_ref_get_ptr,
});

export_ref_c!(RphysShapeSettings, RphysShapeSettingsRef, RphysShapeSettingsRefC {
    to_ref_c: rphys_shape_settings_to_ref_c,
    ref_to_ref_c: rphys_shape_settings_ref_to_ref_c,
    copy: rphys_shape_settings_ref_c_copy,
    free: rphys_shape_settings_ref_c_free,
    get_ptr: rphys_shape_settings_ref_c_get_ptr,
});

// ============================================================================
// Per-kind parameters
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_sphere_shape_settings_get_radius(settings: RphysShapeSettings) -> f32 {
    match unsafe { settings.get() }.kind() {
        SettingsKind::Sphere { radius } => radius,
        other => panic!("not sphere settings: {:?}", other),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_sphere_shape_settings_set_radius(settings: RphysShapeSettings, value: f32) {
    unsafe { settings.get() }.edit(|kind| match kind {
        SettingsKind::Sphere { radius } => *radius = value,
        other => panic!("not sphere settings: {:?}", other),
    });
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_box_shape_settings_get_half_extent(
    settings: RphysShapeSettings,
    out: *mut f32,
    capacity: usize,
) {
    match settings.get().kind() {
        SettingsKind::Box { half_extent, .. } => store_vec3(out, capacity, half_extent),
        other => panic!("not box settings: {:?}", other),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_box_shape_settings_set_half_extent(
    settings: RphysShapeSettings,
    x: f32,
    y: f32,
    z: f32,
) {
    unsafe { settings.get() }.edit(|kind| match kind {
        SettingsKind::Box { half_extent, .. } => *half_extent = Vec3::new(x, y, z),
        other => panic!("not box settings: {:?}", other),
    });
}

/// Convex radius of box settings, or maximum convex radius of hull
/// settings.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_shape_settings_get_convex_radius(settings: RphysShapeSettings) -> f32 {
    match unsafe { settings.get() }.kind() {
        SettingsKind::Box { convex_radius, .. } => convex_radius,
        SettingsKind::ConvexHull {
            max_convex_radius, ..
        } => max_convex_radius,
        other => panic!("no convex radius on {:?}", other),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_convex_shape_settings_set_convex_radius(settings: RphysShapeSettings, value: f32) {
    unsafe { settings.get() }.edit(|kind| match kind {
        SettingsKind::Box { convex_radius, .. } => *convex_radius = value,
        SettingsKind::ConvexHull {
            max_convex_radius, ..
        } => *max_convex_radius = value,
        other => panic!("no convex radius on {:?}", other),
    });
}

// ============================================================================
// Compound settings
// ============================================================================

/// Append a child built from `sub_settings` when the compound is created.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_compound_shape_settings_add_shape(
    settings: RphysShapeSettings,
    px: f32,
    py: f32,
    pz: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
    sub_settings: RphysShapeSettings,
    user_data: u32,
) {
    let source = SubShapeSource::Settings(RefConst::from_ref(unsafe { sub_settings.get() }));
    unsafe { settings.get() }.add_shape(
        Vec3::new(px, py, pz),
        Quat::from_xyzw(rx, ry, rz, rw),
        source,
        user_data,
    );
}

/// Append an existing shape as a child.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_compound_shape_settings_add_shape_instance(
    settings: RphysShapeSettings,
    px: f32,
    py: f32,
    pz: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
    shape: RphysShape,
    user_data: u32,
) {
    let source = SubShapeSource::Shape(RefConst::from_ref(unsafe { shape.get() }));
    unsafe { settings.get() }.add_shape(
        Vec3::new(px, py, pz),
        Quat::from_xyzw(rx, ry, rz, rw),
        source,
        user_data,
    );
}
