//! Exported functions for the physics system, its interfaces and bodies.

use glam::Vec3;

use crate::engine::{BodyId, BodyLockRead, BodyLockWrite, PhysicsSystem, Ref};
use crate::ffi::buffer::{store_dvec3, store_quat, store_vec3};
use crate::ffi::handles::*;
use crate::ffi::ordinal;
use crate::types::Activation;

// ============================================================================
// PhysicsSystem
// ============================================================================

/// A system holding at most `max_bodies` bodies, with default gravity.
#[no_mangle]
pub extern "C" fn rphys_physics_system_create(max_bodies: u32) -> RphysPhysicsSystem {
    RphysPhysicsSystem::new_owned(PhysicsSystem::with_max_bodies(max_bodies))
}

/// Free the system. Views obtained from it must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_free(system: RphysPhysicsSystem) {
    unsafe { system.free() }
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_gravity(system: RphysPhysicsSystem, out: *mut f32, capacity: usize) {
    store_vec3(out, capacity, system.get().gravity());
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_set_gravity(system: RphysPhysicsSystem, x: f32, y: f32, z: f32) {
    unsafe { system.get() }.set_gravity(Vec3::new(x, y, z));
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_num_bodies(system: RphysPhysicsSystem) -> u32 {
    unsafe { system.get() }.num_bodies()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_max_bodies(system: RphysPhysicsSystem) -> u32 {
    unsafe { system.get() }.max_bodies()
}

/// Step the simulation. Returns the update error bits, zero when none.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_update(
    system: RphysPhysicsSystem,
    delta_time: f32,
    collision_steps: u32,
) -> u32 {
    unsafe { system.get() }.update(delta_time, collision_steps)
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_optimize_broad_phase(system: RphysPhysicsSystem) {
    unsafe { system.get() }.optimize_broad_phase();
}

/// Add a constraint. The system keeps a reference until it is removed.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_add_constraint(system: RphysPhysicsSystem, constraint: RphysConstraint) {
    let constraint = Ref::from_ref(unsafe { constraint.get() });
    unsafe { system.get() }.add_constraint(constraint);
}

/// Remove a constraint, dropping the system's reference.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_remove_constraint(
    system: RphysPhysicsSystem,
    constraint: RphysConstraint,
) {
    unsafe { system.get() }.remove_constraint(unsafe { constraint.get() });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_num_constraints(system: RphysPhysicsSystem) -> u32 {
    unsafe { system.get() }.num_constraints()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_body_interface(system: RphysPhysicsSystem) -> RphysBodyInterface {
    RphysBodyInterface::from_ptr(unsafe { system.get() }.body_interface())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_body_lock_interface(
    system: RphysPhysicsSystem,
) -> RphysBodyLockInterface {
    RphysBodyLockInterface::from_ptr(unsafe { system.get() }.body_lock_interface())
}

/// A lock interface whose locks take no lock. Nothing may modify the system
/// while a lock from it is alive.
#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_body_lock_interface_no_lock(
    system: RphysPhysicsSystem,
) -> RphysBodyLockInterface {
    RphysBodyLockInterface::from_ptr(unsafe { system.get().body_lock_interface_no_lock() })
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_broad_phase_query(
    system: RphysPhysicsSystem,
) -> RphysBroadPhaseQuery {
    RphysBroadPhaseQuery::from_ptr(unsafe { system.get() }.broad_phase_query())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_physics_system_get_narrow_phase_query(
    system: RphysPhysicsSystem,
) -> RphysNarrowPhaseQuery {
    RphysNarrowPhaseQuery::from_ptr(unsafe { system.get() }.narrow_phase_query())
}

// ============================================================================
// BodyInterface
// ============================================================================

/// Create a body without adding it. Returns null when the body limit is
/// reached or the settings carry no usable shape.
///
/// The view is valid until the next body is created or destroyed; keep the
/// id to find the body again.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_create_body(
    interface: RphysBodyInterface,
    settings: RphysBodyCreationSettings,
) -> RphysBody {
    match unsafe { interface.get() }.create_body_view(unsafe { settings.get() }) {
        Some(body) => RphysBody::from_ptr(body.as_ptr()),
        None => RphysBody::invalid(),
    }
}

/// Create and add a body. Returns the invalid body id on failure.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_create_and_add_body(
    interface: RphysBodyInterface,
    settings: RphysBodyCreationSettings,
    activation: i32,
) -> u32 {
    let activation: Activation = ordinal(activation);
    unsafe { interface.get() }
        .create_and_add_body(unsafe { settings.get() }, activation)
        .raw()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_add_body(interface: RphysBodyInterface, body_id: u32, activation: i32) {
    let activation: Activation = ordinal(activation);
    unsafe { interface.get() }.add_body(BodyId::from_raw(body_id), activation);
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_remove_body(interface: RphysBodyInterface, body_id: u32) {
    unsafe { interface.get() }.remove_body(BodyId::from_raw(body_id));
}

/// Destroy a body. Views of it dangle afterwards.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_destroy_body(interface: RphysBodyInterface, body_id: u32) {
    unsafe { interface.get() }.destroy_body(BodyId::from_raw(body_id));
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_is_added(interface: RphysBodyInterface, body_id: u32) -> bool {
    unsafe { interface.get() }.is_added(BodyId::from_raw(body_id))
}

/// # Safety
///
/// `out` must be valid for `capacity` doubles.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_position(
    interface: RphysBodyInterface,
    body_id: u32,
    out: *mut f64,
    capacity: usize,
) {
    store_dvec3(out, capacity, interface.get().position(BodyId::from_raw(body_id)));
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_rotation(
    interface: RphysBodyInterface,
    body_id: u32,
    out: *mut f32,
    capacity: usize,
) {
    store_quat(out, capacity, interface.get().rotation(BodyId::from_raw(body_id)));
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_linear_velocity(
    interface: RphysBodyInterface,
    body_id: u32,
    out: *mut f32,
    capacity: usize,
) {
    store_vec3(out, capacity, interface.get().linear_velocity(BodyId::from_raw(body_id)));
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_set_linear_velocity(
    interface: RphysBodyInterface,
    body_id: u32,
    x: f32,
    y: f32,
    z: f32,
) {
    unsafe { interface.get() }.set_linear_velocity(BodyId::from_raw(body_id), Vec3::new(x, y, z));
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_user_data(interface: RphysBodyInterface, body_id: u32) -> u64 {
    unsafe { interface.get() }.user_data(BodyId::from_raw(body_id))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_object_layer(interface: RphysBodyInterface, body_id: u32) -> u16 {
    unsafe { interface.get() }.object_layer(BodyId::from_raw(body_id))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_motion_type(interface: RphysBodyInterface, body_id: u32) -> i32 {
    unsafe { interface.get() }
        .motion_type(BodyId::from_raw(body_id))
        .into()
}

/// A new read-only reference to the body's shape, or null for an unknown
/// body.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_get_shape(interface: RphysBodyInterface, body_id: u32) -> RphysShapeRefC {
    match unsafe { interface.get() }.shape(BodyId::from_raw(body_id)) {
        Some(shape) => RphysShapeRefC::new_owned(shape),
        None => RphysShapeRefC::invalid(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_is_active(interface: RphysBodyInterface, body_id: u32) -> bool {
    unsafe { interface.get() }.is_active(BodyId::from_raw(body_id))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_interface_activate_body(interface: RphysBodyInterface, body_id: u32) {
    unsafe { interface.get() }.activate_body(BodyId::from_raw(body_id));
}

// ============================================================================
// Body
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_id(body: RphysBody) -> u32 {
    unsafe { body.get() }.id().raw()
}

/// # Safety
///
/// `out` must be valid for `capacity` doubles.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_position(body: RphysBody, out: *mut f64, capacity: usize) {
    store_dvec3(out, capacity, body.get().position());
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_rotation(body: RphysBody, out: *mut f32, capacity: usize) {
    store_quat(out, capacity, body.get().rotation());
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_linear_velocity(body: RphysBody, out: *mut f32, capacity: usize) {
    store_vec3(out, capacity, body.get().linear_velocity());
}

/// # Safety
///
/// `out` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_angular_velocity(body: RphysBody, out: *mut f32, capacity: usize) {
    store_vec3(out, capacity, body.get().angular_velocity());
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_user_data(body: RphysBody) -> u64 {
    unsafe { body.get() }.user_data()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_object_layer(body: RphysBody) -> u16 {
    unsafe { body.get() }.object_layer()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_get_motion_type(body: RphysBody) -> i32 {
    unsafe { body.get() }.motion_type().into()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_is_active(body: RphysBody) -> bool {
    unsafe { body.get() }.is_active()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_is_static(body: RphysBody) -> bool {
    unsafe { body.get() }.is_static()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_is_dynamic(body: RphysBody) -> bool {
    unsafe { body.get() }.is_dynamic()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_is_kinematic(body: RphysBody) -> bool {
    unsafe { body.get() }.is_kinematic()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_is_sensor(body: RphysBody) -> bool {
    unsafe { body.get() }.is_sensor()
}

// ============================================================================
// Body locks
// ============================================================================

/// Take the system's shared lock and look up `body_id`. The lock is held
/// until `release_lock` or `free`.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_create(
    interface: RphysBodyLockInterface,
    body_id: u32,
) -> RphysBodyLockRead {
    RphysBodyLockRead::new_owned(BodyLockRead::new(unsafe { interface.get() }, BodyId::from_raw(body_id)))
}

/// The locked body, or null if it was not found or the lock was released.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_get_body(lock: RphysBodyLockRead) -> RphysBody {
    match unsafe { lock.get() }.body() {
        Some(body) => RphysBody::from_ptr(body),
        None => RphysBody::invalid(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_succeeded(lock: RphysBodyLockRead) -> bool {
    unsafe { lock.get() }.succeeded()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_succeeded_and_is_in_broad_phase(lock: RphysBodyLockRead) -> bool {
    unsafe { lock.get() }.succeeded_and_is_in_broad_phase()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_release_lock(lock: RphysBodyLockRead) {
    unsafe { lock.get_mut() }.release_lock();
}

/// Free the lock object, releasing the lock if still held.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_read_free(lock: RphysBodyLockRead) {
    unsafe { lock.free() }
}

/// Take the system's exclusive lock and look up `body_id`. The lock is held
/// until `release_lock` or `free`.
#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_create(
    interface: RphysBodyLockInterface,
    body_id: u32,
) -> RphysBodyLockWrite {
    RphysBodyLockWrite::new_owned(BodyLockWrite::new(unsafe { interface.get() }, BodyId::from_raw(body_id)))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_get_body(lock: RphysBodyLockWrite) -> RphysBody {
    match unsafe { lock.get_mut() }.body_mut() {
        Some(body) => RphysBody::from_ptr(body),
        None => RphysBody::invalid(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_succeeded(lock: RphysBodyLockWrite) -> bool {
    unsafe { lock.get() }.succeeded()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_succeeded_and_is_in_broad_phase(lock: RphysBodyLockWrite) -> bool {
    unsafe { lock.get() }.succeeded_and_is_in_broad_phase()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_release_lock(lock: RphysBodyLockWrite) {
    unsafe { lock.get_mut() }.release_lock();
}

#[no_mangle]
pub unsafe extern "C" fn rphys_body_lock_write_free(lock: RphysBodyLockWrite) {
    unsafe { lock.free() }
}

// ============================================================================
// BroadPhaseQuery
// ============================================================================

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_broad_phase_query_collide_aa_box(
    query: RphysBroadPhaseQuery,
    min_x: f32,
    min_y: f32,
    min_z: f32,
    max_x: f32,
    max_y: f32,
    max_z: f32,
    collector: RphysCollector,
) {
    unsafe { query.get() }.collide_aabox(
        Vec3::new(min_x, min_y, min_z),
        Vec3::new(max_x, max_y, max_z),
        unsafe { collector.get_mut() },
    );
}

#[no_mangle]
pub unsafe extern "C" fn rphys_broad_phase_query_collide_sphere(
    query: RphysBroadPhaseQuery,
    x: f32,
    y: f32,
    z: f32,
    radius: f32,
    collector: RphysCollector,
) {
    unsafe { query.get() }.collide_sphere(Vec3::new(x, y, z), radius, unsafe { collector.get_mut() });
}

#[no_mangle]
pub unsafe extern "C" fn rphys_broad_phase_query_collide_point(
    query: RphysBroadPhaseQuery,
    x: f32,
    y: f32,
    z: f32,
    collector: RphysCollector,
) {
    unsafe { query.get() }.collide_point(Vec3::new(x, y, z), unsafe { collector.get_mut() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BodyCreationSettings, Shape};
    use crate::types::MotionType;
    use glam::{DVec3, Quat};

    fn sphere_settings(y: f64) -> RphysBodyCreationSettings {
        let shape = Shape::sphere(0.5).get().to_const();
        RphysBodyCreationSettings::new_owned(BodyCreationSettings::from_shape(
            shape,
            DVec3::new(0.0, y, 0.0),
            Quat::IDENTITY,
            MotionType::Dynamic,
            1,
        ))
    }

    #[test]
    fn test_create_and_lock_body() {
        let system = rphys_physics_system_create(4);
        let interface = unsafe { rphys_physics_system_get_body_interface(system) };
        let settings = sphere_settings(2.0);

        let id = unsafe { rphys_body_interface_create_and_add_body(interface, settings, Activation::Activate.into()) };
        assert_ne!(id, BodyId::INVALID.raw());
        assert!(unsafe { rphys_body_interface_is_added(interface, id) });

        let lock = unsafe { rphys_body_lock_read_create(rphys_physics_system_get_body_lock_interface(system), id) };
        assert!(unsafe { rphys_body_lock_read_succeeded_and_is_in_broad_phase(lock) });
        let body = unsafe { rphys_body_lock_read_get_body(lock) };
        assert_eq!(unsafe { rphys_body_get_id(body) }, id);
        assert_eq!(unsafe { rphys_body_get_object_layer(body) }, 1);
        let mut position = [0.0f64; 3];
        unsafe { rphys_body_get_position(body, position.as_mut_ptr(), 3) };
        assert_eq!(position, [0.0, 2.0, 0.0]);

        unsafe { rphys_body_lock_read_release_lock(lock) };
        assert!(!unsafe { rphys_body_lock_read_get_body(lock) }.is_valid());
        unsafe { rphys_body_lock_read_free(lock) };

        // The lock is gone, so writers get through.
        unsafe { rphys_body_interface_set_linear_velocity(interface, id, 1.0, 0.0, 0.0) };

        unsafe { settings.free() };
        unsafe { rphys_physics_system_free(system) };
    }

    #[test]
    fn test_body_limit() {
        let system = rphys_physics_system_create(1);
        let interface = unsafe { rphys_physics_system_get_body_interface(system) };
        let settings = sphere_settings(0.0);

        assert!(unsafe { rphys_body_interface_create_body(interface, settings) }.is_valid());
        assert!(!unsafe { rphys_body_interface_create_body(interface, settings) }.is_valid());
        assert_eq!(unsafe { rphys_physics_system_get_num_bodies(system) }, 1);

        unsafe { settings.free() };
        unsafe { rphys_physics_system_free(system) };
    }

    #[test]
    fn test_query_through_all_hit_collector() {
        let system = rphys_physics_system_create(8);
        let interface = unsafe { rphys_physics_system_get_body_interface(system) };
        let settings = sphere_settings(0.0);
        let id = unsafe {
            rphys_body_interface_create_and_add_body(
                interface,
                settings,
                Activation::DontActivate.into(),
            )
        };

        let collector = crate::ffi::rphys_all_hit_collector_create_default();
        let query = unsafe { rphys_physics_system_get_broad_phase_query(system) };
        unsafe { rphys_broad_phase_query_collide_point(query, 0.0, 0.0, 0.0, collector.into()) };
        assert_eq!(unsafe { crate::ffi::rphys_all_hit_collector_count_hits(collector) }, 1);
        assert_eq!(unsafe { crate::ffi::rphys_all_hit_collector_get_hit(collector, 0) }, id);

        unsafe {
            crate::ffi::rphys_all_hit_collector_free(collector);
            settings.free();
        }
        unsafe { rphys_physics_system_free(system) };
    }
}
