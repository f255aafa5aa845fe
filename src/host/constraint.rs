//! Constraint settings and constraints.

use glam::DVec3;

use crate::engine::BodyId;
use crate::ffi::{self, RphysConstraint, RphysConstraintRef, RphysConstraintSettings, RphysConstraintSettingsRef};
use crate::host::system::Body;
use crate::types::{ConstraintSpace, ConstraintSubType, ConstraintType};

host_handle!(
    /// A reference to shared constraint settings.
    ///
    /// Settings are shared: edits through one reference are seen by all.
    ConstraintSettingsRef(RphysConstraintSettingsRef),
    free: ffi::rphys_constraint_settings_ref_free,
    sync
);

fn own_settings(settings: RphysConstraintSettings) -> ConstraintSettingsRef {
    unsafe { ConstraintSettingsRef::from_handle(ffi::rphys_constraint_settings_to_ref(settings)) }
}

impl ConstraintSettingsRef {
    /// Fixed constraint settings in world space.
    pub fn fixed() -> Self {
        own_settings(ffi::rphys_fixed_constraint_settings_create())
    }

    /// Point constraint settings in world space.
    pub fn point() -> Self {
        own_settings(ffi::rphys_point_constraint_settings_create())
    }

    fn ptr(&self) -> RphysConstraintSettings {
        unsafe { ffi::rphys_constraint_settings_ref_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_constraint_settings_ref_copy(self.handle)) }
    }

    pub fn ref_count(&self) -> u32 {
        unsafe { ffi::rphys_constraint_settings_get_ref_count(self.ptr()) }
    }

    pub fn sub_type(&self) -> ConstraintSubType {
        ffi::ordinal(unsafe { ffi::rphys_constraint_settings_get_sub_type(self.ptr()) })
    }

    pub fn enabled(&self) -> bool {
        unsafe { ffi::rphys_constraint_settings_get_enabled(self.ptr()) }
    }

    pub fn set_enabled(&self, enabled: bool) {
        unsafe { ffi::rphys_constraint_settings_set_enabled(self.ptr(), enabled) };
    }

    pub fn constraint_priority(&self) -> u32 {
        unsafe { ffi::rphys_constraint_settings_get_constraint_priority(self.ptr()) }
    }

    pub fn set_constraint_priority(&self, priority: u32) {
        unsafe { ffi::rphys_constraint_settings_set_constraint_priority(self.ptr(), priority) };
    }

    pub fn num_velocity_steps_override(&self) -> u32 {
        unsafe { ffi::rphys_constraint_settings_get_num_velocity_steps_override(self.ptr()) }
    }

    pub fn set_num_velocity_steps_override(&self, steps: u32) {
        unsafe { ffi::rphys_constraint_settings_set_num_velocity_steps_override(self.ptr(), steps) };
    }

    pub fn num_position_steps_override(&self) -> u32 {
        unsafe { ffi::rphys_constraint_settings_get_num_position_steps_override(self.ptr()) }
    }

    pub fn set_num_position_steps_override(&self, steps: u32) {
        unsafe { ffi::rphys_constraint_settings_set_num_position_steps_override(self.ptr(), steps) };
    }

    pub fn user_data(&self) -> u64 {
        unsafe { ffi::rphys_constraint_settings_get_user_data(self.ptr()) }
    }

    pub fn set_user_data(&self, user_data: u64) {
        unsafe { ffi::rphys_constraint_settings_set_user_data(self.ptr(), user_data) };
    }

    pub fn space(&self) -> ConstraintSpace {
        ffi::ordinal(unsafe { ffi::rphys_two_body_constraint_settings_get_space(self.ptr()) })
    }

    pub fn set_space(&self, space: ConstraintSpace) {
        unsafe { ffi::rphys_two_body_constraint_settings_set_space(self.ptr(), space.into()) };
    }

    pub fn point1(&self) -> DVec3 {
        let mut out = [0.0f64; 3];
        unsafe { ffi::rphys_two_body_constraint_settings_get_point1(self.ptr(), out.as_mut_ptr(), 3) };
        DVec3::from_array(out)
    }

    pub fn set_point1(&self, point: DVec3) {
        unsafe { ffi::rphys_two_body_constraint_settings_set_point1(self.ptr(), point.x, point.y, point.z) };
    }

    pub fn point2(&self) -> DVec3 {
        let mut out = [0.0f64; 3];
        unsafe { ffi::rphys_two_body_constraint_settings_get_point2(self.ptr(), out.as_mut_ptr(), 3) };
        DVec3::from_array(out)
    }

    pub fn set_point2(&self, point: DVec3) {
        unsafe { ffi::rphys_two_body_constraint_settings_set_point2(self.ptr(), point.x, point.y, point.z) };
    }

    /// Fixed settings only; panics on point settings.
    pub fn auto_detect_point(&self) -> bool {
        unsafe { ffi::rphys_fixed_constraint_settings_get_auto_detect_point(self.ptr()) }
    }

    /// Fixed settings only; panics on point settings.
    pub fn set_auto_detect_point(&self, auto_detect: bool) {
        unsafe { ffi::rphys_fixed_constraint_settings_set_auto_detect_point(self.ptr(), auto_detect) };
    }

    /// Build a constraint between two bodies in their current poses.
    pub fn create(&self, body1: &Body<'_>, body2: &Body<'_>) -> ConstraintRef {
        let constraint = unsafe {
            ffi::rphys_two_body_constraint_settings_create(
                self.ptr(),
                body1.handle(),
                body2.handle(),
            )
        };
        unsafe { ConstraintRef::from_handle(ffi::rphys_constraint_to_ref(constraint)) }
    }
}

host_handle!(
    /// A reference to a constraint between two bodies.
    ConstraintRef(RphysConstraintRef),
    free: ffi::rphys_constraint_ref_free,
    sync
);

impl ConstraintRef {
    pub(crate) fn ptr(&self) -> RphysConstraint {
        unsafe { ffi::rphys_constraint_ref_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_constraint_ref_copy(self.handle)) }
    }

    pub fn ref_count(&self) -> u32 {
        unsafe { ffi::rphys_constraint_get_ref_count(self.ptr()) }
    }

    pub fn constraint_type(&self) -> ConstraintType {
        ffi::ordinal(unsafe { ffi::rphys_constraint_get_type(self.ptr()) })
    }

    pub fn sub_type(&self) -> ConstraintSubType {
        ffi::ordinal(unsafe { ffi::rphys_constraint_get_sub_type(self.ptr()) })
    }

    pub fn enabled(&self) -> bool {
        unsafe { ffi::rphys_constraint_get_enabled(self.ptr()) }
    }

    pub fn set_enabled(&self, enabled: bool) {
        unsafe { ffi::rphys_constraint_set_enabled(self.ptr(), enabled) };
    }

    pub fn constraint_priority(&self) -> u32 {
        unsafe { ffi::rphys_constraint_get_constraint_priority(self.ptr()) }
    }

    pub fn set_constraint_priority(&self, priority: u32) {
        unsafe { ffi::rphys_constraint_set_constraint_priority(self.ptr(), priority) };
    }

    pub fn num_velocity_steps_override(&self) -> u32 {
        unsafe { ffi::rphys_constraint_get_num_velocity_steps_override(self.ptr()) }
    }

    pub fn set_num_velocity_steps_override(&self, steps: u32) {
        unsafe { ffi::rphys_constraint_set_num_velocity_steps_override(self.ptr(), steps) };
    }

    pub fn num_position_steps_override(&self) -> u32 {
        unsafe { ffi::rphys_constraint_get_num_position_steps_override(self.ptr()) }
    }

    pub fn set_num_position_steps_override(&self, steps: u32) {
        unsafe { ffi::rphys_constraint_set_num_position_steps_override(self.ptr(), steps) };
    }

    pub fn user_data(&self) -> u64 {
        unsafe { ffi::rphys_constraint_get_user_data(self.ptr()) }
    }

    pub fn set_user_data(&self, user_data: u64) {
        unsafe { ffi::rphys_constraint_set_user_data(self.ptr(), user_data) };
    }

    pub fn body1(&self) -> BodyId {
        BodyId::from_raw(unsafe { ffi::rphys_two_body_constraint_get_body1(self.ptr()) })
    }

    pub fn body2(&self) -> BodyId {
        BodyId::from_raw(unsafe { ffi::rphys_two_body_constraint_get_body2(self.ptr()) })
    }

    /// New settings reproducing this constraint in body-local space.
    pub fn settings(&self) -> ConstraintSettingsRef {
        unsafe { ConstraintSettingsRef::from_handle(ffi::rphys_constraint_get_constraint_settings(self.ptr())) }
    }
}
