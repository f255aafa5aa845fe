//! Exported functions for result objects.

use crate::ffi::handles::*;

// ============================================================================
// ShapeResult
// ============================================================================

export_result!(RphysShapeResult => RphysShapeRef {
    create_default: rphys_shape_result_create_default,
    free: rphys_shape_result_free,
    is_empty: rphys_shape_result_is_empty,
    is_valid: rphys_shape_result_is_valid,
    has_error: rphys_shape_result_has_error,
    get: rphys_shape_result_get,
    get_error: rphys_shape_result_get_error,
});

// ============================================================================
// PhysicsSceneResult
// ============================================================================

export_result!(RphysPhysicsSceneResult => RphysPhysicsSceneRef {
    create_default: rphys_physics_scene_result_create_default,
    free: rphys_physics_scene_result_free,
    is_empty: rphys_physics_scene_result_is_empty,
    is_valid: rphys_physics_scene_result_is_valid,
    has_error: rphys_physics_scene_result_has_error,
    get: rphys_physics_scene_result_get,
    get_error: rphys_physics_scene_result_get_error,
});
