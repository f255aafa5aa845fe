//! Exported functions for physics scenes.

use crate::engine::{PhysicsScene, RefTarget};
use crate::ffi::handles::*;

fn scene_of<'a>(scene: RphysPhysicsScene) -> &'a PhysicsScene {
    unsafe { scene.get() }.get()
}

/// An empty scene, unreferenced.
#[no_mangle]
pub extern "C" fn rphys_physics_scene_create() -> RphysPhysicsScene {
    RphysPhysicsScene::from_ptr(RefTarget::new(PhysicsScene::new()).as_ptr())
}

/// Append a copy of `settings`.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_add_body(scene: RphysPhysicsScene, settings: RphysBodyCreationSettings) {
    scene_of(scene).add_body(unsafe { settings.get() });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_get_num_bodies(scene: RphysPhysicsScene) -> u32 {
    scene_of(scene).num_bodies() as u32
}

/// View of the settings at `index`, owned by the scene. Null when out of
/// range.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_get_body(
    scene: RphysPhysicsScene,
    index: u32,
) -> RphysBodyCreationSettings {
    match scene_of(scene).body_ptr(index as usize) {
        Some(settings) => RphysBodyCreationSettings::from_ptr(settings),
        None => RphysBodyCreationSettings::invalid(),
    }
}

/// Create and add every body. False if any body could not be created.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_create_bodies(
    scene: RphysPhysicsScene,
    system: RphysPhysicsSystem,
) -> bool {
    scene_of(scene).create_bodies(unsafe { system.get() })
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_save_binary_state(
    scene: RphysPhysicsScene,
    stream: RphysStreamOut,
    save_shapes: bool,
) {
    scene_of(scene).save_binary_state(unsafe { stream.get_mut() }, save_shapes);
}

/// Read a scene written by `rphys_physics_scene_save_binary_state`. The
/// caller frees the result.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_scene_restore_from_binary_state(
    stream: RphysStreamIn,
) -> RphysPhysicsSceneResult {
    RphysPhysicsSceneResult::new_owned(PhysicsScene::restore_from_binary_state(unsafe { stream.get_mut() }))
}

export_ref!(RphysPhysicsScene, RphysPhysicsSceneRef {
    get_ref_count: rphys_physics_scene_get_ref_count,
    set_embedded: rphys_physics_scene_set_embedded,
    to_ref: rphys_physics_scene_to_ref,
    copy: rphys_physics_scene_ref_copy,
    free: rphys_physics_scene_ref_free,
    get_ptr: rphys_physics_scene_ref_get_ptr,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BodyCreationSettings, StreamIn, StreamOut};
    use crate::ffi::result::*;

    #[test]
    fn test_truncated_stream_reports_error() {
        let stream = RphysStreamIn::new_owned(StreamIn::new(vec![1, 2]));
        let result = unsafe { rphys_physics_scene_restore_from_binary_state(stream) };
        assert!(unsafe { rphys_physics_scene_result_has_error(result) });
        assert!(!unsafe { rphys_physics_scene_result_is_valid(result) });
        unsafe { rphys_physics_scene_result_free(result) };
        unsafe { stream.free() };
    }

    #[test]
    fn test_save_and_restore() {
        let scene = rphys_physics_scene_create();
        let reference = unsafe { rphys_physics_scene_to_ref(scene) };
        let mut settings = BodyCreationSettings::default();
        settings.user_data = 5;
        let settings = RphysBodyCreationSettings::new_owned(settings);
        unsafe { rphys_physics_scene_add_body(scene, settings) };
        unsafe { rphys_physics_scene_add_body(scene, settings) };
        assert_eq!(unsafe { rphys_physics_scene_get_num_bodies(scene) }, 2);
        assert!(!unsafe { rphys_physics_scene_get_body(scene, 2) }.is_valid());

        let out = RphysStreamOut::new_owned(StreamOut::new());
        unsafe { rphys_physics_scene_save_binary_state(scene, out, false) };
        let input = RphysStreamIn::new_owned(StreamIn::new(unsafe { out.get() }.data().to_vec()));
        let result = unsafe { rphys_physics_scene_restore_from_binary_state(input) };
        let restored = unsafe { rphys_physics_scene_result_get(result) };
        let restored_scene = unsafe { rphys_physics_scene_ref_get_ptr(restored) };
        assert_eq!(unsafe { rphys_physics_scene_get_num_bodies(restored_scene) }, 2);
        let body = unsafe { rphys_physics_scene_get_body(restored_scene, 1) };
        assert_eq!(unsafe { body.get() }.user_data, 5);

        unsafe { rphys_physics_scene_ref_free(restored) };
        unsafe {
            rphys_physics_scene_result_free(result);
            input.free();
            out.free();
            settings.free();
        }
        unsafe { rphys_physics_scene_ref_free(reference) };
    }
}
