//! Exported functions for shapes.
//!
//! Shape handles are non-owning; lifetime is managed through
//! `RphysShapeRef` / `RphysShapeRefC`. The per-kind `create` functions
//! return a shape nobody references yet, or null when the parameters are
//! invalid.

use glam::{Quat, Vec3};

use crate::engine::shape::{ConvexHull, MutableCompound};
use crate::engine::{RefConst, RefTarget, Shape, ShapeResult};
use crate::ffi::buffer::{store_quat, store_vec3, PinnedArray};
use crate::ffi::handles::*;

fn shape_of<'a>(shape: RphysShape) -> &'a Shape {
    unsafe { shape.get() }.get()
}

fn convex_hull_of<'a>(shape: RphysShape) -> &'a ConvexHull {
    match shape_of(shape).as_convex_hull() {
        Some(hull) => hull,
        None => panic!("{:?} is not a convex hull", shape),
    }
}

fn mutable_compound_of<'a>(shape: RphysShape) -> &'a MutableCompound {
    match shape_of(shape).as_mutable_compound() {
        Some(compound) => compound,
        None => panic!("{:?} is not a mutable compound", shape),
    }
}

/// Hand out a freshly created shape with no references, or null.
fn unreferenced(result: ShapeResult) -> RphysShape {
    match result {
        ShapeResult::Valid(shape) => RphysShape::from_ptr(shape.into_unreferenced().as_ptr()),
        ShapeResult::Error(message) => {
            log::warn!("shape creation failed: {}", message);
            RphysShape::invalid()
        }
        ShapeResult::Empty => RphysShape::invalid(),
    }
}

// ============================================================================
// Shape
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_type(shape: RphysShape) -> i32 {
    shape_of(shape).shape_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_sub_type(shape: RphysShape) -> i32 {
    shape_of(shape).sub_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_user_data(shape: RphysShape) -> u64 {
    shape_of(shape).user_data()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_set_user_data(shape: RphysShape, user_data: u64) {
    shape_of(shape).set_user_data(user_data);
}

/// # Safety
///
/// `out_min` and `out_max` must be valid for their capacities.
#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_local_bounds(
    shape: RphysShape,
    out_min: *mut f32,
    min_capacity: usize,
    out_max: *mut f32,
    max_capacity: usize,
) {
    let (min, max) = shape_of(shape).local_bounds();
    store_vec3(out_min, min_capacity, min);
    store_vec3(out_max, max_capacity, max);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_volume(shape: RphysShape) -> f32 {
    shape_of(shape).volume()
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_shape_get_center_of_mass(shape: RphysShape, out: *mut f32, capacity: usize) {
    store_vec3(out, capacity, shape_of(shape).center_of_mass());
}

#[no_mangle]
pub unsafe extern "C" fn rphys_shape_save_binary_state(shape: RphysShape, stream: RphysStreamOut) {
    shape_of(shape).save_binary_state(unsafe { stream.get_mut() });
}

/// Read a shape written by `rphys_shape_save_binary_state`. The caller
/// frees the result.
#[no_mangle]
pub unsafe extern "C" fn rphys_shape_restore_from_binary_state(stream: RphysStreamIn) -> RphysShapeResult {
    RphysShapeResult::new_owned(Shape::restore_from_binary_state(unsafe { stream.get_mut() }))
}

export_ref!(RphysShape, RphysShapeRef {
    get_ref_count: rphys_shape_get_ref_count,
    set_embedded: rphys_shape_set_embedded,
    to_ref: rphys_shape_to_ref,
    copy: rphys_shape_ref_copy,
    free: rphys_shape_ref_free,
    get_ptr: rphys_shape_ref_get_ptr,
});

export_ref_c!(RphysShape, RphysShapeRef, RphysShapeRefC {
    to_ref_c: rphys_shape_to_ref_c,
    ref_to_ref_c: rphys_shape_ref_to_ref_c,
    copy: rphys_shape_ref_c_copy,
    free: rphys_shape_ref_c_free,
    get_ptr: rphys_shape_ref_c_get_ptr,
});

// ============================================================================
// Sphere, box, capsule
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_sphere_shape_create(radius: f32) -> RphysShape {
    unreferenced(Shape::sphere(radius))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_sphere_shape_get_radius(shape: RphysShape) -> f32 {
    match shape_of(shape).radius() {
        Some(radius) => radius,
        None => panic!("{:?} has no radius", shape),
    }
}

#[no_mangle]
pub extern "C" fn rphys_box_shape_create(hx: f32, hy: f32, hz: f32, convex_radius: f32) -> RphysShape {
    unreferenced(Shape::cuboid(Vec3::new(hx, hy, hz), convex_radius))
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_box_shape_get_half_extent(shape: RphysShape, out: *mut f32, capacity: usize) {
    match shape_of(shape).half_extent() {
        Some(half_extent) => store_vec3(out, capacity, half_extent),
        None => panic!("{:?} is not a box", shape),
    }
}

/// Convex radius of a box or convex hull.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_shape_get_convex_radius(shape: RphysShape) -> f32 {
    match shape_of(shape).convex_radius() {
        Some(convex_radius) => convex_radius,
        None => panic!("{:?} has no convex radius", shape),
    }
}

#[no_mangle]
pub extern "C" fn rphys_capsule_shape_create(half_height: f32, radius: f32) -> RphysShape {
    unreferenced(Shape::capsule(half_height, radius))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_capsule_shape_get_half_height_of_cylinder(shape: RphysShape) -> f32 {
    match shape_of(shape).half_height_of_cylinder() {
        Some(half_height) => half_height,
        None => panic!("{:?} is not a capsule", shape),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_capsule_shape_get_radius(shape: RphysShape) -> f32 {
    unsafe { rphys_sphere_shape_get_radius(shape) }
}

// ============================================================================
// Convex hull
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_num_points(shape: RphysShape) -> u32 {
    convex_hull_of(shape).num_points() as u32
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_point(
    shape: RphysShape,
    index: u32,
    out: *mut f32,
    capacity: usize,
) {
    store_vec3(out, capacity, convex_hull_of(shape).points()[index as usize]);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_num_faces(shape: RphysShape) -> u32 {
    convex_hull_of(shape).num_faces() as u32
}

#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_num_vertices_in_face(shape: RphysShape, face: u32) -> u32 {
    convex_hull_of(shape).face_vertices(face as usize).len() as u32
}

/// Copy up to `max_vertices` point indices of `face` into `out`. Returns
/// the number of vertices in the face, which may exceed what was copied.
///
/// # Safety
///
/// `out` must be valid for `max_vertices` writes.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_face_vertices(
    shape: RphysShape,
    face: u32,
    max_vertices: u32,
    out: *mut u32,
) -> u32 {
    let vertices = convex_hull_of(shape).face_vertices(face as usize);
    PinnedArray::pin(out, max_vertices as usize).commit(vertices);
    vertices.len() as u32
}

#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_num_planes(shape: RphysShape) -> u32 {
    convex_hull_of(shape).planes().len() as u32
}

/// Copy the face planes as normal x, y, z and constant, four floats per
/// plane, into `out` of `capacity` floats. Returns the planes copied.
///
/// # Safety
///
/// `out` must be valid for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn rphys_convex_hull_shape_get_planes(
    shape: RphysShape,
    out: *mut f32,
    capacity: usize,
) -> u32 {
    let flattened: Vec<f32> = convex_hull_of(shape)
        .planes()
        .iter()
        .flat_map(|plane| plane.normal.extend(plane.constant).to_array())
        .collect();
    let copied = PinnedArray::pin(out, capacity).commit(&flattened);
    (copied / 4) as u32
}

// ============================================================================
// Compounds
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_compound_shape_get_num_sub_shapes(shape: RphysShape) -> u32 {
    match shape_of(shape).as_compound() {
        Some(compound) => compound.num_sub_shapes() as u32,
        None => panic!("{:?} is not a compound", shape),
    }
}

/// View of a child. It dangles once the child is removed from a mutable
/// compound.
#[no_mangle]
pub unsafe extern "C" fn rphys_compound_shape_get_sub_shape(shape: RphysShape, index: u32) -> RphysSubShape {
    match shape_of(shape).sub_shape_ptr(index as usize) {
        Some(sub_shape) => RphysSubShape::from_ptr(sub_shape),
        None => panic!("{:?} is not a compound", shape),
    }
}

/// The child's shape, as a non-owning handle.
#[no_mangle]
pub unsafe extern "C" fn rphys_sub_shape_get_shape(sub_shape: RphysSubShape) -> RphysShape {
    RphysShape::from_ptr(unsafe { sub_shape.get() }.shape().as_ptr())
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_sub_shape_get_position_com(sub_shape: RphysSubShape, out: *mut f32, capacity: usize) {
    store_vec3(out, capacity, sub_shape.get().position());
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_sub_shape_get_rotation(sub_shape: RphysSubShape, out: *mut f32, capacity: usize) {
    store_quat(out, capacity, sub_shape.get().rotation());
}

#[no_mangle]
pub unsafe extern "C" fn rphys_sub_shape_get_user_data(sub_shape: RphysSubShape) -> u32 {
    unsafe { sub_shape.get() }.user_data()
}

/// Create a mutable compound with no children.
#[no_mangle]
pub extern "C" fn rphys_mutable_compound_shape_create() -> RphysShape {
    unreferenced(Shape::mutable_compound(Vec::new()))
}

/// Add `sub_shape` as a child; returns its index.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_mutable_compound_shape_add_shape(
    shape: RphysShape,
    px: f32,
    py: f32,
    pz: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
    sub_shape: RphysShape,
    user_data: u32,
) -> u32 {
    let child: &RefTarget<Shape> = unsafe { sub_shape.get() };
    mutable_compound_of(shape).add_shape(
        Vec3::new(px, py, pz),
        Quat::from_xyzw(rx, ry, rz, rw),
        RefConst::from_ref(child),
        user_data,
    )
}

/// Remove a child; views of it dangle afterwards.
#[no_mangle]
pub unsafe extern "C" fn rphys_mutable_compound_shape_remove_shape(shape: RphysShape, index: u32) {
    mutable_compound_of(shape).remove_shape(index);
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_mutable_compound_shape_modify_shape(
    shape: RphysShape,
    index: u32,
    px: f32,
    py: f32,
    pz: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    rw: f32,
) {
    mutable_compound_of(shape).modify_shape(
        index,
        Vec3::new(px, py, pz),
        Quat::from_xyzw(rx, ry, rz, rw),
    );
}

#[no_mangle]
pub unsafe extern "C" fn rphys_mutable_compound_shape_adjust_center_of_mass(shape: RphysShape) {
    mutable_compound_of(shape).adjust_center_of_mass();
}
