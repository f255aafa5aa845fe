//! Physics scenes: a set of bodies that can be saved and recreated.

use crate::error::{Error, Result};
use crate::ffi::{self, RphysPhysicsScene, RphysPhysicsSceneRef, RphysPhysicsSceneResult};
use crate::host::body_settings::BodyCreationSettings;
use crate::host::stream::{StreamIn, StreamOut};
use crate::host::system::PhysicsSystem;
use crate::host::take_string;
use crate::types::StreamType;

host_handle!(
    /// A reference to a physics scene.
    PhysicsSceneRef(RphysPhysicsSceneRef),
    free: ffi::rphys_physics_scene_ref_free,
    sync
);

impl PhysicsSceneRef {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_physics_scene_to_ref(ffi::rphys_physics_scene_create())) }
    }

    fn ptr(&self) -> RphysPhysicsScene {
        unsafe { ffi::rphys_physics_scene_ref_get_ptr(self.handle) }
    }

    pub fn try_clone(&self) -> Self {
        unsafe { Self::from_handle(ffi::rphys_physics_scene_ref_copy(self.handle)) }
    }

    pub fn ref_count(&self) -> u32 {
        unsafe { ffi::rphys_physics_scene_get_ref_count(self.ptr()) }
    }

    /// Store a copy of `settings`.
    pub fn add_body(&self, settings: &BodyCreationSettings) {
        unsafe { ffi::rphys_physics_scene_add_body(self.ptr(), settings.handle()) };
    }

    pub fn num_bodies(&self) -> u32 {
        unsafe { ffi::rphys_physics_scene_get_num_bodies(self.ptr()) }
    }

    /// A copy of the settings of body `index`.
    pub fn body(&self, index: u32) -> Option<BodyCreationSettings> {
        let settings = unsafe { ffi::rphys_physics_scene_get_body(self.ptr(), index) };
        settings
            .is_valid()
            .then(|| BodyCreationSettings::view(settings).try_clone())
    }

    /// Create and add every body to `system`. `false` if any failed.
    pub fn create_bodies(&self, system: &PhysicsSystem) -> bool {
        unsafe { ffi::rphys_physics_scene_create_bodies(self.ptr(), system.handle()) }
    }

    pub fn save_binary_state(&self, stream: &mut StreamOut, save_shapes: bool) {
        unsafe { ffi::rphys_physics_scene_save_binary_state(self.ptr(), stream.handle(), save_shapes) };
    }

    pub fn restore_from_binary_state(stream: &mut StreamIn) -> PhysicsSceneResult {
        unsafe { PhysicsSceneResult::from_handle(ffi::rphys_physics_scene_restore_from_binary_state(stream.handle())) }
    }

    /// Encode as a whole object; `None` if encoding failed.
    pub fn to_object_stream(&self, stream_type: StreamType) -> Option<Vec<u8>> {
        let stream = unsafe { ffi::rphys_object_stream_out_write_physics_scene(self.ptr(), stream_type.into()) };
        stream
            .is_valid()
            .then(|| unsafe { StreamOut::from_handle(stream) }.to_bytes())
    }

    pub fn from_object_stream(bytes: &[u8]) -> Option<Self> {
        let stream = StreamIn::from_bytes(bytes);
        let scene = unsafe { ffi::rphys_object_stream_in_read_physics_scene(stream.handle()) };
        scene.is_valid().then(|| unsafe { Self::from_handle(scene) })
    }
}

impl Default for PhysicsSceneRef {
    fn default() -> Self {
        Self::new()
    }
}

host_handle!(
    /// The outcome of restoring a scene.
    PhysicsSceneResult(RphysPhysicsSceneResult),
    free: ffi::rphys_physics_scene_result_free,
    sync
);

impl PhysicsSceneResult {
    pub fn is_empty(&self) -> bool {
        unsafe { ffi::rphys_physics_scene_result_is_empty(self.handle) }
    }

    pub fn is_valid(&self) -> bool {
        unsafe { ffi::rphys_physics_scene_result_is_valid(self.handle) }
    }

    pub fn has_error(&self) -> bool {
        unsafe { ffi::rphys_physics_scene_result_has_error(self.handle) }
    }

    pub fn error(&self) -> String {
        unsafe { take_string(ffi::rphys_physics_scene_result_get_error(self.handle)) }
    }

    pub fn into_scene(self) -> Result<PhysicsSceneRef> {
        if self.is_valid() {
            Ok(unsafe { PhysicsSceneRef::from_handle(ffi::rphys_physics_scene_result_get(self.handle)) })
        } else {
            Err(Error::SceneRestore(self.error()))
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec3, Quat};

    use super::*;
    use crate::host::ShapeRef;
    use crate::types::MotionType;

    fn scene_with_bodies() -> PhysicsSceneRef {
        let shape = ShapeRef::sphere(1.0).unwrap().to_const();
        let scene = PhysicsSceneRef::new();
        for i in 0..3 {
            let mut settings =
                BodyCreationSettings::from_shape(&shape, DVec3::new(i as f64 * 3.0, 0.0, 0.0), Quat::IDENTITY, MotionType::Dynamic, 1);
            settings.set_user_data(i);
            scene.add_body(&settings);
        }
        scene
    }

    #[test]
    fn test_binary_state_round_trip() {
        let scene = scene_with_bodies();
        let mut out = StreamOut::new();
        scene.save_binary_state(&mut out, true);

        let mut input = StreamIn::from(&out);
        let restored = PhysicsSceneRef::restore_from_binary_state(&mut input)
            .into_scene()
            .unwrap();
        assert_eq!(restored.num_bodies(), 3);
        assert_eq!(restored.body(2).unwrap().user_data(), 2);
        assert!(restored.body(3).is_none());

        let system = PhysicsSystem::new(16);
        assert!(restored.create_bodies(&system));
        assert_eq!(system.num_bodies(), 3);
    }

    #[test]
    fn test_restore_error() {
        let mut input = StreamIn::from_bytes(&[1, 2]);
        let result = PhysicsSceneRef::restore_from_binary_state(&mut input);
        assert!(result.has_error());
        assert!(matches!(result.into_scene(), Err(Error::SceneRestore(_))));
    }
}
