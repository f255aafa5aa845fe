//! Body creation settings.

use glam::{DVec3, Quat, Vec3};

use crate::ffi::{self, RphysBodyCreationSettings};
use crate::host::shape::{ShapeRefC, ShapeResult, ShapeSettingsRefC};
use crate::host::stream::{StreamIn, StreamOut};
use crate::types::{MotionQuality, MotionType, OverrideMassProperties, StreamType};

host_handle!(
    /// Everything needed to create a body.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use glam::{DVec3, Quat};
    /// use rphys::{BodyCreationSettings, MotionType, ShapeRef};
    ///
    /// let shape = ShapeRef::sphere(0.5)?.to_const();
    /// let mut settings =
    ///     BodyCreationSettings::from_shape(&shape, DVec3::Y, Quat::IDENTITY, MotionType::Dynamic, 1);
    /// settings.set_friction(0.8);
    /// # Ok::<(), rphys::Error>(())
    /// ```
    BodyCreationSettings(RphysBodyCreationSettings),
    free: ffi::rphys_body_creation_settings_free,
    sync
);

/// Generates a getter/setter pair over the exported property functions.
macro_rules! property {
    ($get:ident, $set:ident: $ty:ty => $ffi_get:path, $ffi_set:path) => {
        pub fn $get(&self) -> $ty {
            unsafe { $ffi_get(self.handle) }
        }

        pub fn $set(&mut self, value: $ty) {
            unsafe { $ffi_set(self.handle, value) }
        }
    };
}

impl BodyCreationSettings {
    /// Settings with engine defaults and no shape.
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_body_creation_settings_create_default()) }
    }

    pub fn from_shape(
        shape: &ShapeRefC,
        position: DVec3,
        rotation: Quat,
        motion_type: MotionType,
        object_layer: u16,
    ) -> Self {
        unsafe {
            Self::from_handle(ffi::rphys_body_creation_settings_create_from_shape(
                shape.ptr(),
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
                motion_type.into(),
                object_layer,
            ))
        }
    }

    pub fn from_shape_settings(
        settings: &ShapeSettingsRefC,
        position: DVec3,
        rotation: Quat,
        motion_type: MotionType,
        object_layer: u16,
    ) -> Self {
        unsafe {
            Self::from_handle(ffi::rphys_body_creation_settings_create_from_shape_settings(
                settings.ptr(),
                position.x,
                position.y,
                position.z,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
                motion_type.into(),
                object_layer,
            ))
        }
    }

    /// An owned copy sharing the shape.
    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_body_creation_settings_create_copy(self.handle)) }
    }

    pub fn position(&self) -> DVec3 {
        let mut out = [0.0f64; 3];
        unsafe { ffi::rphys_body_creation_settings_get_position(self.handle, out.as_mut_ptr(), 3) };
        DVec3::from_array(out)
    }

    pub fn set_position(&mut self, position: DVec3) {
        unsafe { ffi::rphys_body_creation_settings_set_position(self.handle, position.x, position.y, position.z) };
    }

    pub fn rotation(&self) -> Quat {
        let mut out = [0.0f32; 4];
        unsafe { ffi::rphys_body_creation_settings_get_rotation(self.handle, out.as_mut_ptr(), 4) };
        Quat::from_array(out)
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        unsafe {
            ffi::rphys_body_creation_settings_set_rotation(
                self.handle,
                rotation.x,
                rotation.y,
                rotation.z,
                rotation.w,
            )
        };
    }

    pub fn linear_velocity(&self) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_body_creation_settings_get_linear_velocity(self.handle, out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        unsafe {
            ffi::rphys_body_creation_settings_set_linear_velocity(
                self.handle,
                velocity.x,
                velocity.y,
                velocity.z,
            )
        };
    }

    pub fn angular_velocity(&self) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_body_creation_settings_get_angular_velocity(self.handle, out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        unsafe {
            ffi::rphys_body_creation_settings_set_angular_velocity(
                self.handle,
                velocity.x,
                velocity.y,
                velocity.z,
            )
        };
    }

    property!(user_data, set_user_data: u64 =>
        ffi::rphys_body_creation_settings_get_user_data, ffi::rphys_body_creation_settings_set_user_data);
    property!(object_layer, set_object_layer: u16 =>
        ffi::rphys_body_creation_settings_get_object_layer, ffi::rphys_body_creation_settings_set_object_layer);
    property!(allow_sleeping, set_allow_sleeping: bool =>
        ffi::rphys_body_creation_settings_get_allow_sleeping, ffi::rphys_body_creation_settings_set_allow_sleeping);
    property!(is_sensor, set_is_sensor: bool =>
        ffi::rphys_body_creation_settings_get_is_sensor, ffi::rphys_body_creation_settings_set_is_sensor);
    property!(friction, set_friction: f32 =>
        ffi::rphys_body_creation_settings_get_friction, ffi::rphys_body_creation_settings_set_friction);
    property!(restitution, set_restitution: f32 =>
        ffi::rphys_body_creation_settings_get_restitution, ffi::rphys_body_creation_settings_set_restitution);
    property!(linear_damping, set_linear_damping: f32 =>
        ffi::rphys_body_creation_settings_get_linear_damping, ffi::rphys_body_creation_settings_set_linear_damping);
    property!(angular_damping, set_angular_damping: f32 =>
        ffi::rphys_body_creation_settings_get_angular_damping, ffi::rphys_body_creation_settings_set_angular_damping);
    property!(gravity_factor, set_gravity_factor: f32 =>
        ffi::rphys_body_creation_settings_get_gravity_factor, ffi::rphys_body_creation_settings_set_gravity_factor);
    property!(mass_override, set_mass_override: f32 =>
        ffi::rphys_body_creation_settings_get_mass_override, ffi::rphys_body_creation_settings_set_mass_override);
    property!(allow_dynamic_or_kinematic, set_allow_dynamic_or_kinematic: bool =>
        ffi::rphys_body_creation_settings_get_allow_dynamic_or_kinematic,
        ffi::rphys_body_creation_settings_set_allow_dynamic_or_kinematic);
    property!(max_linear_velocity, set_max_linear_velocity: f32 =>
        ffi::rphys_body_creation_settings_get_max_linear_velocity,
        ffi::rphys_body_creation_settings_set_max_linear_velocity);
    property!(max_angular_velocity, set_max_angular_velocity: f32 =>
        ffi::rphys_body_creation_settings_get_max_angular_velocity,
        ffi::rphys_body_creation_settings_set_max_angular_velocity);
    property!(inertia_multiplier, set_inertia_multiplier: f32 =>
        ffi::rphys_body_creation_settings_get_inertia_multiplier,
        ffi::rphys_body_creation_settings_set_inertia_multiplier);
    property!(num_velocity_steps_override, set_num_velocity_steps_override: u32 =>
        ffi::rphys_body_creation_settings_get_num_velocity_steps_override,
        ffi::rphys_body_creation_settings_set_num_velocity_steps_override);
    property!(num_position_steps_override, set_num_position_steps_override: u32 =>
        ffi::rphys_body_creation_settings_get_num_position_steps_override,
        ffi::rphys_body_creation_settings_set_num_position_steps_override);

    pub fn motion_type(&self) -> MotionType {
        ffi::ordinal(unsafe { ffi::rphys_body_creation_settings_get_motion_type(self.handle) })
    }

    pub fn set_motion_type(&mut self, motion_type: MotionType) {
        unsafe { ffi::rphys_body_creation_settings_set_motion_type(self.handle, motion_type.into()) };
    }

    pub fn motion_quality(&self) -> MotionQuality {
        ffi::ordinal(unsafe { ffi::rphys_body_creation_settings_get_motion_quality(self.handle) })
    }

    pub fn set_motion_quality(&mut self, quality: MotionQuality) {
        unsafe { ffi::rphys_body_creation_settings_set_motion_quality(self.handle, quality.into()) };
    }

    pub fn override_mass_properties(&self) -> OverrideMassProperties {
        ffi::ordinal(unsafe { ffi::rphys_body_creation_settings_get_override_mass_properties(self.handle) })
    }

    pub fn set_override_mass_properties(&mut self, value: OverrideMassProperties) {
        unsafe { ffi::rphys_body_creation_settings_set_override_mass_properties(self.handle, value.into()) };
    }

    /// A new read-only reference to the shape, if one is set.
    pub fn shape(&self) -> Option<ShapeRefC> {
        let shape = unsafe { ffi::rphys_body_creation_settings_get_shape(self.handle) };
        shape
            .is_valid()
            .then(|| unsafe { ShapeRefC::from_handle(ffi::rphys_shape_to_ref_c(shape)) })
    }

    pub fn set_shape(&mut self, shape: Option<&ShapeRefC>) {
        let shape = shape.map_or(ffi::RphysShape::invalid(), ShapeRefC::ptr);
        unsafe { ffi::rphys_body_creation_settings_set_shape(self.handle, shape) };
    }

    pub fn set_shape_settings(&mut self, settings: Option<&ShapeSettingsRefC>) {
        let settings = settings.map_or(ffi::RphysShapeSettings::invalid(), ShapeSettingsRefC::ptr);
        unsafe { ffi::rphys_body_creation_settings_set_shape_settings(self.handle, settings) };
    }

    pub fn has_shape_settings(&self) -> bool {
        unsafe { ffi::rphys_body_creation_settings_get_shape_settings(self.handle) }.is_valid()
    }

    pub fn has_mass_properties(&self) -> bool {
        unsafe { ffi::rphys_body_creation_settings_has_mass_properties(self.handle) }
    }

    /// Turn the shape settings into a shape and keep it.
    pub fn convert_shape_settings(&mut self) -> ShapeResult {
        unsafe { ShapeResult::from_handle(ffi::rphys_body_creation_settings_convert_shape_settings(self.handle)) }
    }

    pub fn save_binary_state(&self, stream: &mut StreamOut) {
        unsafe { ffi::rphys_body_creation_settings_save_binary_state(self.handle, stream.handle()) };
    }

    /// Overwrite the scalar fields; the shape is kept.
    pub fn restore_binary_state(&mut self, stream: &mut StreamIn) {
        unsafe { ffi::rphys_body_creation_settings_restore_binary_state(self.handle, stream.handle()) };
    }

    /// Encode as a whole object; `None` if encoding failed.
    pub fn to_object_stream(&self, stream_type: StreamType) -> Option<Vec<u8>> {
        let stream = unsafe {
            ffi::rphys_object_stream_out_write_body_creation_settings(
                self.handle,
                stream_type.into(),
            )
        };
        stream
            .is_valid()
            .then(|| unsafe { StreamOut::from_handle(stream) }.to_bytes())
    }

    /// Decode settings written by [`to_object_stream`](Self::to_object_stream).
    pub fn from_object_stream(bytes: &[u8]) -> Option<Self> {
        let stream = StreamIn::from_bytes(bytes);
        let settings = unsafe { ffi::rphys_object_stream_in_read_body_creation_settings(stream.handle()) };
        settings
            .is_valid()
            .then(|| unsafe { Self::from_handle(settings) })
    }
}

impl Default for BodyCreationSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ShapeSettingsRef;

    #[test]
    fn test_defaults() {
        let settings = BodyCreationSettings::new();
        assert_eq!(settings.friction(), 0.2);
        assert_eq!(settings.linear_damping(), 0.05);
        assert_eq!(settings.motion_type(), MotionType::Dynamic);
        assert!(settings.allow_sleeping());
        assert!(settings.shape().is_none());
    }

    #[test]
    fn test_convert_without_shape() {
        let mut settings = BodyCreationSettings::new();
        let result = settings.convert_shape_settings();
        assert!(result.has_error());
        assert_eq!(result.error(), "No shape present!");
    }

    #[test]
    fn test_convert_shape_settings() {
        let shape_settings = ShapeSettingsRef::sphere(0.25).to_const();
        let mut settings = BodyCreationSettings::from_shape_settings(
            &shape_settings,
            DVec3::ZERO,
            Quat::IDENTITY,
            MotionType::Static,
            0,
        );
        assert!(settings.has_shape_settings());
        assert!(settings.convert_shape_settings().is_valid());
        assert!(!settings.has_shape_settings());
        assert!(settings.shape().is_some());
    }

    #[test]
    fn test_object_stream_binary() {
        let mut settings = BodyCreationSettings::new();
        settings.set_restitution(0.4);
        settings.set_motion_quality(MotionQuality::LinearCast);
        let bytes = settings.to_object_stream(StreamType::Binary).unwrap();
        let restored = BodyCreationSettings::from_object_stream(&bytes).unwrap();
        assert_eq!(restored.restitution(), 0.4);
        assert_eq!(restored.motion_quality(), MotionQuality::LinearCast);
        assert!(BodyCreationSettings::from_object_stream(b"BOS1.0\n").is_none());
    }
}
