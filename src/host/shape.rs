//! Shapes and shape settings.

use glam::{Quat, Vec3};

use crate::error::{Error, Result};
use crate::ffi::{
    self, RphysShape, RphysShapeRef, RphysShapeRefC, RphysShapeResult, RphysShapeSettings, RphysShapeSettingsRef,
    RphysShapeSettingsRefC,
};
use crate::host::stream::{StreamIn, StreamOut};
use crate::host::take_string;
use crate::types::{ShapeSubType, ShapeType};

host_handle!(
    /// A mutable reference to shape settings.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rphys::ShapeSettingsRef;
    ///
    /// let settings = ShapeSettingsRef::sphere(0.5);
    /// let shape = settings.create_shape().into_shape()?;
    /// println!("volume: {}", shape.volume());
    /// # Ok::<(), rphys::Error>(())
    /// ```
    ShapeSettingsRef(RphysShapeSettingsRef),
    free: ffi::rphys_shape_settings_ref_free,
    sync
);

host_handle!(
    /// A read-only reference to shape settings.
    ShapeSettingsRefC(RphysShapeSettingsRefC),
    free: ffi::rphys_shape_settings_ref_c_free,
    sync
);

fn own_settings(settings: RphysShapeSettings) -> ShapeSettingsRef {
    // SAFETY: to_ref returns a new reference nobody else owns.
    unsafe { ShapeSettingsRef::from_handle(ffi::rphys_shape_settings_to_ref(settings)) }
}

impl ShapeSettingsRef {
    pub fn sphere(radius: f32) -> Self {
        own_settings(ffi::rphys_sphere_shape_settings_create(radius))
    }

    pub fn cuboid(half_extent: Vec3, convex_radius: f32) -> Self {
        own_settings(ffi::rphys_box_shape_settings_create(
            half_extent.x,
            half_extent.y,
            half_extent.z,
            convex_radius,
        ))
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        own_settings(ffi::rphys_capsule_shape_settings_create(half_height, radius))
    }

    pub fn convex_hull(points: &[Vec3], max_convex_radius: f32) -> Self {
        let flat: Vec<f32> = points.iter().flat_map(|p| p.to_array()).collect();
        // SAFETY: `flat` holds 3 floats per point.
        own_settings(unsafe {
            ffi::rphys_convex_hull_shape_settings_create(flat.as_ptr(), points.len(), max_convex_radius)
        })
    }

    pub fn static_compound() -> Self {
        own_settings(ffi::rphys_static_compound_shape_settings_create())
    }

    pub fn mutable_compound() -> Self {
        own_settings(ffi::rphys_mutable_compound_shape_settings_create())
    }

    fn ptr(&self) -> RphysShapeSettings {
        unsafe { ffi::rphys_shape_settings_ref_get_ptr(self.handle) }
    }

    /// Another reference to the same settings.
    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_shape_settings_ref_copy(self.handle)) }
    }

    /// A read-only reference to the same settings.
    pub fn to_const(&self) -> ShapeSettingsRefC {
        unsafe { ShapeSettingsRefC::from_handle(ffi::rphys_shape_settings_ref_to_ref_c(self.handle)) }
    }

    pub fn ref_count(&self) -> u32 {
        unsafe { ffi::rphys_shape_settings_get_ref_count(self.ptr()) }
    }

    pub fn shape_type(&self) -> ShapeType {
        ffi::ordinal(unsafe { ffi::rphys_shape_settings_get_type(self.ptr()) })
    }

    pub fn sub_type(&self) -> ShapeSubType {
        ffi::ordinal(unsafe { ffi::rphys_shape_settings_get_sub_type(self.ptr()) })
    }

    pub fn user_data(&self) -> u64 {
        unsafe { ffi::rphys_shape_settings_get_user_data(self.ptr()) }
    }

    pub fn set_user_data(&self, user_data: u64) {
        unsafe { ffi::rphys_shape_settings_set_user_data(self.ptr(), user_data) };
    }

    /// Radius of sphere settings.
    pub fn radius(&self) -> f32 {
        unsafe { ffi::rphys_sphere_shape_settings_get_radius(self.ptr()) }
    }

    /// Change the radius of sphere settings; clears the cached shape.
    pub fn set_radius(&self, radius: f32) {
        unsafe { ffi::rphys_sphere_shape_settings_set_radius(self.ptr(), radius) };
    }

    /// Convex radius of box or hull settings.
    pub fn convex_radius(&self) -> f32 {
        unsafe { ffi::rphys_convex_shape_settings_get_convex_radius(self.ptr()) }
    }

    pub fn set_convex_radius(&self, convex_radius: f32) {
        unsafe { ffi::rphys_convex_shape_settings_set_convex_radius(self.ptr(), convex_radius) };
    }

    /// Add a child built from `child` to compound settings.
    pub fn add_shape(&self, position: Vec3, rotation: Quat, child: &ShapeSettingsRef, user_data: u32) {
        unsafe {
            ffi::rphys_compound_shape_settings_add_shape(
                self.ptr(),
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
                child.ptr(),
                user_data,
            )
        };
    }

    /// Add an existing shape as a child of compound settings.
    pub fn add_shape_instance(&self, position: Vec3, rotation: Quat, child: &ShapeRefC, user_data: u32) {
        unsafe {
            ffi::rphys_compound_shape_settings_add_shape_instance(
                self.ptr(),
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
                child.ptr(),
                user_data,
            )
        };
    }

    /// Create the shape, or return the cached result.
    pub fn create_shape(&self) -> ShapeResult {
        unsafe { ShapeResult::from_handle(ffi::rphys_shape_settings_create_shape(self.ptr())) }
    }

    pub fn clear_cached_result(&self) {
        unsafe { ffi::rphys_shape_settings_clear_cached_result(self.ptr()) };
    }
}

impl ShapeSettingsRefC {
    pub(crate) fn ptr(&self) -> RphysShapeSettings {
        unsafe { ffi::rphys_shape_settings_ref_c_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_shape_settings_ref_c_copy(self.handle)) }
    }

    pub fn ref_count(&self) -> u32 {
        unsafe { ffi::rphys_shape_settings_get_ref_count(self.ptr()) }
    }

    pub fn sub_type(&self) -> ShapeSubType {
        ffi::ordinal(unsafe { ffi::rphys_shape_settings_get_sub_type(self.ptr()) })
    }
}

host_handle!(
    /// A mutable reference to a shape.
    ShapeRef(RphysShapeRef),
    free: ffi::rphys_shape_ref_free,
    sync
);

host_handle!(
    /// A read-only reference to a shape.
    ShapeRefC(RphysShapeRefC),
    free: ffi::rphys_shape_ref_c_free,
    sync
);

fn own_shape(shape: RphysShape) -> Result<ShapeRef> {
    if !shape.is_valid() {
        return Err(Error::ShapeCreation("invalid shape parameters".to_string()));
    }
    Ok(unsafe { ShapeRef::from_handle(ffi::rphys_shape_to_ref(shape)) })
}

/// Read accessors shared by both shape reference kinds.
macro_rules! shape_accessors {
    () => {
        pub fn ref_count(&self) -> u32 {
            unsafe { ffi::rphys_shape_get_ref_count(self.ptr()) }
        }

        pub fn shape_type(&self) -> ShapeType {
            ffi::ordinal(unsafe { ffi::rphys_shape_get_type(self.ptr()) })
        }

        pub fn sub_type(&self) -> ShapeSubType {
            ffi::ordinal(unsafe { ffi::rphys_shape_get_sub_type(self.ptr()) })
        }

        pub fn user_data(&self) -> u64 {
            unsafe { ffi::rphys_shape_get_user_data(self.ptr()) }
        }

        /// Local bounding box as (min, max).
        pub fn local_bounds(&self) -> (Vec3, Vec3) {
            let mut min = [0.0f32; 3];
            let mut max = [0.0f32; 3];
            unsafe { ffi::rphys_shape_get_local_bounds(self.ptr(), min.as_mut_ptr(), 3, max.as_mut_ptr(), 3) };
            (Vec3::from_array(min), Vec3::from_array(max))
        }

        pub fn volume(&self) -> f32 {
            unsafe { ffi::rphys_shape_get_volume(self.ptr()) }
        }

        pub fn center_of_mass(&self) -> Vec3 {
            let mut out = [0.0f32; 3];
            unsafe { ffi::rphys_shape_get_center_of_mass(self.ptr(), out.as_mut_ptr(), 3) };
            Vec3::from_array(out)
        }

        /// Number of children of a compound.
        pub fn num_sub_shapes(&self) -> u32 {
            unsafe { ffi::rphys_compound_shape_get_num_sub_shapes(self.ptr()) }
        }

        /// Position of child `index` relative to the compound's center of
        /// mass.
        pub fn sub_shape_position(&self, index: u32) -> Vec3 {
            let sub_shape = unsafe { ffi::rphys_compound_shape_get_sub_shape(self.ptr(), index) };
            let mut out = [0.0f32; 3];
            unsafe { ffi::rphys_sub_shape_get_position_com(sub_shape, out.as_mut_ptr(), 3) };
            Vec3::from_array(out)
        }

        pub fn save_binary_state(&self, stream: &mut StreamOut) {
            unsafe { ffi::rphys_shape_save_binary_state(self.ptr(), stream.handle()) };
        }
    };
}

impl ShapeRef {
    pub fn sphere(radius: f32) -> Result<Self> {
        own_shape(ffi::rphys_sphere_shape_create(radius))
    }

    pub fn cuboid(half_extent: Vec3, convex_radius: f32) -> Result<Self> {
        own_shape(ffi::rphys_box_shape_create(
            half_extent.x,
            half_extent.y,
            half_extent.z,
            convex_radius,
        ))
    }

    pub fn capsule(half_height: f32, radius: f32) -> Result<Self> {
        own_shape(ffi::rphys_capsule_shape_create(half_height, radius))
    }

    /// An empty mutable compound.
    pub fn mutable_compound() -> Result<Self> {
        own_shape(ffi::rphys_mutable_compound_shape_create())
    }

    /// Read a shape written by [`save_binary_state`](Self::save_binary_state).
    pub fn restore_from_binary_state(stream: &mut StreamIn) -> ShapeResult {
        unsafe { ShapeResult::from_handle(ffi::rphys_shape_restore_from_binary_state(stream.handle())) }
    }

    pub(crate) fn ptr(&self) -> RphysShape {
        unsafe { ffi::rphys_shape_ref_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_shape_ref_copy(self.handle)) }
    }

    pub fn to_const(&self) -> ShapeRefC {
        unsafe { ShapeRefC::from_handle(ffi::rphys_shape_ref_to_ref_c(self.handle)) }
    }

    shape_accessors!();

    pub fn set_user_data(&self, user_data: u64) {
        unsafe { ffi::rphys_shape_set_user_data(self.ptr(), user_data) };
    }

    /// Add a child to a mutable compound; returns its index.
    pub fn add_shape(&self, position: Vec3, rotation: Quat, child: &ShapeRefC, user_data: u32) -> u32 {
        unsafe {
            ffi::rphys_mutable_compound_shape_add_shape(
                self.ptr(),
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
                child.ptr(),
                user_data,
            )
        }
    }

    pub fn remove_shape(&self, index: u32) {
        unsafe { ffi::rphys_mutable_compound_shape_remove_shape(self.ptr(), index) };
    }

    pub fn modify_shape(&self, index: u32, position: Vec3, rotation: Quat) {
        unsafe {
            ffi::rphys_mutable_compound_shape_modify_shape(
                self.ptr(),
                index,
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
            )
        };
    }

    pub fn adjust_center_of_mass(&self) {
        unsafe { ffi::rphys_mutable_compound_shape_adjust_center_of_mass(self.ptr()) };
    }
}

impl ShapeRefC {
    pub(crate) fn ptr(&self) -> RphysShape {
        unsafe { ffi::rphys_shape_ref_c_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_shape_ref_c_copy(self.handle)) }
    }

    shape_accessors!();
}

host_handle!(
    /// Outcome of creating a shape.
    ShapeResult(RphysShapeResult),
    free: ffi::rphys_shape_result_free,
    sync
);

impl ShapeResult {
    pub fn is_empty(&self) -> bool {
        unsafe { ffi::rphys_shape_result_is_empty(self.handle) }
    }

    pub fn is_valid(&self) -> bool {
        unsafe { ffi::rphys_shape_result_is_valid(self.handle) }
    }

    pub fn has_error(&self) -> bool {
        unsafe { ffi::rphys_shape_result_has_error(self.handle) }
    }

    /// The error message, empty when there is none.
    pub fn error(&self) -> String {
        unsafe { take_string(ffi::rphys_shape_result_get_error(self.handle)) }
    }

    /// A reference to the shape, or the error.
    pub fn into_shape(self) -> Result<ShapeRef> {
        if self.is_valid() {
            Ok(unsafe { ShapeRef::from_handle(ffi::rphys_shape_result_get(self.handle)) })
        } else if self.has_error() {
            Err(Error::ShapeCreation(self.error()))
        } else {
            Err(Error::ShapeCreation("empty result".to_string()))
        }
    }
}
