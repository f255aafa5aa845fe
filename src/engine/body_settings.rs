//! Settings from which bodies are created.

use std::f32::consts::PI;

use glam::{DVec3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::refcount::RefConst;
use crate::engine::result::ShapeResult;
use crate::engine::shape::{Shape, ShapeSettings};
use crate::engine::stream::{StreamIn, StreamOut};
use crate::types::{MotionQuality, MotionType, OverrideMassProperties};

/// Everything needed to create a body.
///
/// The scalar fields serialize through [`save_binary_state`]; the shape is
/// carried separately and is left untouched by a restore.
///
/// [`save_binary_state`]: BodyCreationSettings::save_binary_state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyCreationSettings {
    pub position: DVec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub user_data: u64,
    pub object_layer: u16,
    pub motion_type: MotionType,
    pub motion_quality: MotionQuality,
    pub allow_dynamic_or_kinematic: bool,
    pub is_sensor: bool,
    pub allow_sleeping: bool,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub max_linear_velocity: f32,
    pub max_angular_velocity: f32,
    pub gravity_factor: f32,
    pub num_velocity_steps_override: u32,
    pub num_position_steps_override: u32,
    pub override_mass_properties: OverrideMassProperties,
    pub inertia_multiplier: f32,
    pub mass_override: f32,
    #[serde(skip)]
    shape_settings: Option<RefConst<ShapeSettings>>,
    #[serde(skip)]
    shape: Option<RefConst<Shape>>,
}

impl Default for BodyCreationSettings {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            user_data: 0,
            object_layer: 0,
            motion_type: MotionType::Dynamic,
            motion_quality: MotionQuality::Discrete,
            allow_dynamic_or_kinematic: false,
            is_sensor: false,
            allow_sleeping: true,
            friction: 0.2,
            restitution: 0.0,
            linear_damping: 0.05,
            angular_damping: 0.05,
            max_linear_velocity: 500.0,
            max_angular_velocity: 0.25 * PI * 60.0,
            gravity_factor: 1.0,
            num_velocity_steps_override: 0,
            num_position_steps_override: 0,
            override_mass_properties: OverrideMassProperties::CalculateMassAndInertia,
            inertia_multiplier: 1.0,
            mass_override: 0.0,
            shape_settings: None,
            shape: None,
        }
    }
}

impl BodyCreationSettings {
    /// Settings for a body using an existing shape.
    pub fn from_shape(
        shape: RefConst<Shape>,
        position: DVec3,
        rotation: Quat,
        motion_type: MotionType,
        object_layer: u16,
    ) -> Self {
        Self {
            position,
            rotation,
            motion_type,
            object_layer,
            shape: Some(shape),
            ..Self::default()
        }
    }

    /// Settings for a body whose shape is created from `settings` on demand.
    pub fn from_shape_settings(
        settings: RefConst<ShapeSettings>,
        position: DVec3,
        rotation: Quat,
        motion_type: MotionType,
        object_layer: u16,
    ) -> Self {
        Self {
            position,
            rotation,
            motion_type,
            object_layer,
            shape_settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn shape_settings(&self) -> Option<&RefConst<ShapeSettings>> {
        self.shape_settings.as_ref()
    }

    /// Use `settings` for the shape, forgetting any shape already set.
    pub fn set_shape_settings(&mut self, settings: Option<RefConst<ShapeSettings>>) {
        self.shape_settings = settings;
        self.shape = None;
    }

    /// The shape, if one has been set or converted.
    pub fn shape(&self) -> Option<&RefConst<Shape>> {
        self.shape.as_ref()
    }

    /// Use `shape`, forgetting any shape settings.
    pub fn set_shape(&mut self, shape: Option<RefConst<Shape>>) {
        self.shape = shape;
        self.shape_settings = None;
    }

    /// The shape, converting shape settings first if needed.
    ///
    /// Returns `None` when there is no shape or the conversion failed.
    pub fn get_or_create_shape(&mut self) -> Option<RefConst<Shape>> {
        if self.shape.is_none() && self.shape_settings.is_some() {
            self.convert_shape_settings();
        }
        self.shape.clone()
    }

    /// Turn the shape settings into a shape and keep it.
    ///
    /// When a shape is already present it is returned as is. The settings
    /// are dropped whether or not the conversion succeeds.
    pub fn convert_shape_settings(&mut self) -> ShapeResult {
        if let Some(shape) = &self.shape {
            self.shape_settings = None;
            return ShapeResult::valid(shape.cast_mut());
        }
        let Some(settings) = self.shape_settings.take() else {
            return ShapeResult::error("No shape present!");
        };
        let result = settings.create();
        if let ShapeResult::Valid(shape) = &result {
            self.shape = Some(shape.to_const());
        }
        result
    }

    /// Whether mass properties can be computed: a movable body needs a
    /// shape or an explicit mass.
    pub fn has_mass_properties(&self) -> bool {
        self.allow_dynamic_or_kinematic || self.motion_type != MotionType::Static
    }

    /// Write the scalar fields to `stream`.
    pub fn save_binary_state(&self, stream: &mut StreamOut) {
        stream.write_state(self);
    }

    /// Overwrite the scalar fields from `stream`, keeping the shape.
    ///
    /// On a read failure the stream is marked failed and `self` is left
    /// unchanged.
    pub fn restore_binary_state(&mut self, stream: &mut StreamIn) {
        if let Some(mut restored) = stream.read_state::<BodyCreationSettings>() {
            restored.shape = self.shape.take();
            restored.shape_settings = self.shape_settings.take();
            *self = restored;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::refcount::Ref;

    #[test]
    fn test_defaults() {
        let bcs = BodyCreationSettings::default();
        assert!(bcs.allow_sleeping);
        assert_eq!(bcs.friction, 0.2);
        assert_eq!(bcs.linear_damping, 0.05);
        assert_eq!(bcs.max_linear_velocity, 500.0);
        assert!((bcs.max_angular_velocity - 15.0 * PI).abs() < 1e-5);
        assert_eq!(bcs.motion_type, MotionType::Dynamic);
        assert_eq!(bcs.rotation, Quat::IDENTITY);
        assert!(bcs.has_mass_properties());
    }

    #[test]
    fn test_convert_without_shape() {
        let mut bcs = BodyCreationSettings::default();
        let result = bcs.convert_shape_settings();
        assert!(result.has_error());
        assert_eq!(result.error_message(), "No shape present!");
    }

    #[test]
    fn test_convert_keeps_shape() {
        let settings = Ref::new(ShapeSettings::sphere(1.0)).to_const();
        let mut bcs = BodyCreationSettings::from_shape_settings(
            settings,
            DVec3::ZERO,
            Quat::IDENTITY,
            MotionType::Dynamic,
            0,
        );
        let result = bcs.convert_shape_settings();
        assert!(result.is_valid());
        assert!(bcs.shape_settings().is_none());
        assert!(bcs.shape().is_some());

        let again = bcs.convert_shape_settings();
        assert!(again.get().ptr_eq(result.get()));
    }

    #[test]
    fn test_restore_keeps_shape() {
        let shape = Shape::sphere(1.0).get().to_const();
        let mut source = BodyCreationSettings::default();
        source.friction = 0.9;
        source.object_layer = 11;
        let mut out = StreamOut::new();
        source.save_binary_state(&mut out);

        let mut target = BodyCreationSettings::from_shape(
            shape.clone(),
            DVec3::ONE,
            Quat::IDENTITY,
            MotionType::Static,
            0,
        );
        target.restore_binary_state(&mut StreamIn::new(out.into_data()));
        assert_eq!(target.friction, 0.9);
        assert_eq!(target.object_layer, 11);
        assert_eq!(target.position, DVec3::ZERO);
        assert!(target.shape().is_some_and(|s| s.ptr_eq(&shape)));
    }
}
