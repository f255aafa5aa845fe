//! The physics system and the views it hands out.

use std::marker::PhantomData;

use glam::{DVec3, Quat, Vec3};

use crate::engine::BodyId;
use crate::error::{Error, Result};
use crate::ffi::{
    self, RphysBody, RphysBodyInterface, RphysBodyLockInterface, RphysBodyLockRead, RphysBodyLockWrite,
    RphysBroadPhaseQuery, RphysNarrowPhaseQuery, RphysPhysicsSystem,
};
use crate::host::body_settings::BodyCreationSettings;
use crate::host::collector::{CastRayCollector, Collector};
use crate::host::constraint::ConstraintRef;
use crate::host::shape::ShapeRefC;
use crate::types::{Activation, MotionType};

host_handle!(
    /// A physics simulation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use glam::{DVec3, Quat};
    /// use rphys::{Activation, BodyCreationSettings, MotionType, PhysicsSystem, ShapeRef};
    ///
    /// let system = PhysicsSystem::new(1024);
    /// let shape = ShapeRef::sphere(0.5)?.to_const();
    /// let settings =
    ///     BodyCreationSettings::from_shape(&shape, DVec3::new(0.0, 10.0, 0.0), Quat::IDENTITY, MotionType::Dynamic, 1);
    /// let id = system.body_interface().create_and_add_body(&settings, Activation::Activate);
    ///
    /// for _ in 0..60 {
    ///     system.update(1.0 / 60.0, 1);
    /// }
    /// println!("fell to {:?}", system.body_interface().position(id));
    /// # Ok::<(), rphys::Error>(())
    /// ```
    PhysicsSystem(RphysPhysicsSystem),
    free: ffi::rphys_physics_system_free,
    sync
);

impl PhysicsSystem {
    /// A system holding at most `max_bodies` bodies.
    pub fn new(max_bodies: u32) -> Self {
        unsafe { Self::from_handle(ffi::rphys_physics_system_create(max_bodies)) }
    }

    pub fn gravity(&self) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_physics_system_get_gravity(self.handle, out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn set_gravity(&self, gravity: Vec3) {
        unsafe { ffi::rphys_physics_system_set_gravity(self.handle, gravity.x, gravity.y, gravity.z) };
    }

    pub fn num_bodies(&self) -> u32 {
        unsafe { ffi::rphys_physics_system_get_num_bodies(self.handle) }
    }

    pub fn max_bodies(&self) -> u32 {
        unsafe { ffi::rphys_physics_system_get_max_bodies(self.handle) }
    }

    /// Step the simulation; returns the update error bits.
    pub fn update(&self, delta_time: f32, collision_steps: u32) -> u32 {
        unsafe { ffi::rphys_physics_system_update(self.handle, delta_time, collision_steps) }
    }

    pub fn optimize_broad_phase(&self) {
        unsafe { ffi::rphys_physics_system_optimize_broad_phase(self.handle) };
    }

    /// Add a constraint; the system shares its reference count.
    pub fn add_constraint(&self, constraint: &ConstraintRef) {
        unsafe { ffi::rphys_physics_system_add_constraint(self.handle, constraint.ptr()) };
    }

    pub fn remove_constraint(&self, constraint: &ConstraintRef) {
        unsafe { ffi::rphys_physics_system_remove_constraint(self.handle, constraint.ptr()) };
    }

    pub fn num_constraints(&self) -> u32 {
        unsafe { ffi::rphys_physics_system_get_num_constraints(self.handle) }
    }

    pub fn body_interface(&self) -> BodyInterface<'_> {
        BodyInterface {
            handle: unsafe { ffi::rphys_physics_system_get_body_interface(self.handle) },
            _system: PhantomData,
        }
    }

    /// Lock the system for reading and look up `id`.
    pub fn lock_read(&self, id: BodyId) -> BodyLockRead<'_> {
        unsafe { BodyLockRead::new(self.lock_interface(), id) }
    }

    /// Lock the system exclusively and look up `id`.
    pub fn lock_write(&self, id: BodyId) -> BodyLockWrite<'_> {
        unsafe { BodyLockWrite::new(self.lock_interface(), id) }
    }

    /// As [`lock_read`](Self::lock_read), failing with
    /// [`Error::LockFailed`] when `id` names no body.
    pub fn try_lock_read(&self, id: BodyId) -> Result<BodyLockRead<'_>> {
        let lock = self.lock_read(id);
        if lock.succeeded() {
            Ok(lock)
        } else {
            Err(Error::LockFailed)
        }
    }

    /// As [`lock_write`](Self::lock_write), failing with
    /// [`Error::LockFailed`] when `id` names no body.
    pub fn try_lock_write(&self, id: BodyId) -> Result<BodyLockWrite<'_>> {
        let lock = self.lock_write(id);
        if lock.succeeded() {
            Ok(lock)
        } else {
            Err(Error::LockFailed)
        }
    }

    /// Look up `id` for reading without taking the system lock.
    ///
    /// # Safety
    ///
    /// Nothing may modify the system, from any thread, while the returned
    /// lock is alive.
    pub unsafe fn lock_read_no_lock(&self, id: BodyId) -> BodyLockRead<'_> {
        unsafe { BodyLockRead::new(ffi::rphys_physics_system_get_body_lock_interface_no_lock(self.handle), id) }
    }

    /// Look up `id` for writing without taking the system lock.
    ///
    /// # Safety
    ///
    /// As [`lock_read_no_lock`](Self::lock_read_no_lock), and no other
    /// lock on the same body may be alive.
    pub unsafe fn lock_write_no_lock(&self, id: BodyId) -> BodyLockWrite<'_> {
        unsafe { BodyLockWrite::new(ffi::rphys_physics_system_get_body_lock_interface_no_lock(self.handle), id) }
    }

    fn lock_interface(&self) -> RphysBodyLockInterface {
        unsafe { ffi::rphys_physics_system_get_body_lock_interface(self.handle) }
    }

    pub fn broad_phase_query(&self) -> BroadPhaseQuery<'_> {
        BroadPhaseQuery {
            handle: unsafe { ffi::rphys_physics_system_get_broad_phase_query(self.handle) },
            _system: PhantomData,
        }
    }

    pub fn narrow_phase_query(&self) -> NarrowPhaseQuery<'_> {
        NarrowPhaseQuery {
            handle: unsafe { ffi::rphys_physics_system_get_narrow_phase_query(self.handle) },
            _system: PhantomData,
        }
    }
}

/// Creates and inspects bodies of one [`PhysicsSystem`].
#[derive(Debug, Clone, Copy)]
pub struct BodyInterface<'a> {
    handle: RphysBodyInterface,
    _system: PhantomData<&'a PhysicsSystem>,
}

impl<'a> BodyInterface<'a> {
    /// Create a body outside the broad phase. `None` when the body limit is
    /// reached or the settings have no usable shape.
    pub fn create_body(&self, settings: &BodyCreationSettings) -> Option<BodyId> {
        let body = unsafe { ffi::rphys_body_interface_create_body(self.handle, settings.handle()) };
        body.is_valid().then(|| BodyId::from_raw(unsafe { ffi::rphys_body_get_id(body) }))
    }

    /// Create and add a body; [`BodyId::INVALID`] on failure.
    pub fn create_and_add_body(&self, settings: &BodyCreationSettings, activation: Activation) -> BodyId {
        BodyId::from_raw(unsafe {
            ffi::rphys_body_interface_create_and_add_body(
                self.handle,
                settings.handle(),
                activation.into(),
            )
        })
    }

    pub fn add_body(&self, id: BodyId, activation: Activation) {
        unsafe { ffi::rphys_body_interface_add_body(self.handle, id.raw(), activation.into()) };
    }

    pub fn remove_body(&self, id: BodyId) {
        unsafe { ffi::rphys_body_interface_remove_body(self.handle, id.raw()) };
    }

    pub fn destroy_body(&self, id: BodyId) {
        unsafe { ffi::rphys_body_interface_destroy_body(self.handle, id.raw()) };
    }

    pub fn is_added(&self, id: BodyId) -> bool {
        unsafe { ffi::rphys_body_interface_is_added(self.handle, id.raw()) }
    }

    pub fn position(&self, id: BodyId) -> DVec3 {
        let mut out = [0.0f64; 3];
        unsafe { ffi::rphys_body_interface_get_position(self.handle, id.raw(), out.as_mut_ptr(), 3) };
        DVec3::from_array(out)
    }

    pub fn rotation(&self, id: BodyId) -> Quat {
        let mut out = [0.0f32; 4];
        unsafe { ffi::rphys_body_interface_get_rotation(self.handle, id.raw(), out.as_mut_ptr(), 4) };
        Quat::from_array(out)
    }

    pub fn linear_velocity(&self, id: BodyId) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_body_interface_get_linear_velocity(self.handle, id.raw(), out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn set_linear_velocity(&self, id: BodyId, velocity: Vec3) {
        unsafe {
            ffi::rphys_body_interface_set_linear_velocity(
                self.handle,
                id.raw(),
                velocity.x,
                velocity.y,
                velocity.z,
            )
        };
    }

    pub fn user_data(&self, id: BodyId) -> u64 {
        unsafe { ffi::rphys_body_interface_get_user_data(self.handle, id.raw()) }
    }

    pub fn object_layer(&self, id: BodyId) -> u16 {
        unsafe { ffi::rphys_body_interface_get_object_layer(self.handle, id.raw()) }
    }

    pub fn motion_type(&self, id: BodyId) -> MotionType {
        ffi::ordinal(unsafe { ffi::rphys_body_interface_get_motion_type(self.handle, id.raw()) })
    }

    pub fn shape(&self, id: BodyId) -> Option<ShapeRefC> {
        let shape = unsafe { ffi::rphys_body_interface_get_shape(self.handle, id.raw()) };
        shape.is_valid().then(|| unsafe { ShapeRefC::from_handle(shape) })
    }

    pub fn is_active(&self, id: BodyId) -> bool {
        unsafe { ffi::rphys_body_interface_is_active(self.handle, id.raw()) }
    }

    pub fn activate_body(&self, id: BodyId) {
        unsafe { ffi::rphys_body_interface_activate_body(self.handle, id.raw()) };
    }
}

/// A body seen through a held lock.
#[derive(Debug, Clone, Copy)]
pub struct Body<'a> {
    handle: RphysBody,
    _lock: PhantomData<&'a ()>,
}

impl Body<'_> {
    pub(crate) fn handle(&self) -> RphysBody {
        self.handle
    }

    pub fn id(&self) -> BodyId {
        BodyId::from_raw(unsafe { ffi::rphys_body_get_id(self.handle) })
    }

    pub fn position(&self) -> DVec3 {
        let mut out = [0.0f64; 3];
        unsafe { ffi::rphys_body_get_position(self.handle, out.as_mut_ptr(), 3) };
        DVec3::from_array(out)
    }

    pub fn rotation(&self) -> Quat {
        let mut out = [0.0f32; 4];
        unsafe { ffi::rphys_body_get_rotation(self.handle, out.as_mut_ptr(), 4) };
        Quat::from_array(out)
    }

    pub fn linear_velocity(&self) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_body_get_linear_velocity(self.handle, out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn angular_velocity(&self) -> Vec3 {
        let mut out = [0.0f32; 3];
        unsafe { ffi::rphys_body_get_angular_velocity(self.handle, out.as_mut_ptr(), 3) };
        Vec3::from_array(out)
    }

    pub fn user_data(&self) -> u64 {
        unsafe { ffi::rphys_body_get_user_data(self.handle) }
    }

    pub fn object_layer(&self) -> u16 {
        unsafe { ffi::rphys_body_get_object_layer(self.handle) }
    }

    pub fn motion_type(&self) -> MotionType {
        ffi::ordinal(unsafe { ffi::rphys_body_get_motion_type(self.handle) })
    }

    pub fn is_active(&self) -> bool {
        unsafe { ffi::rphys_body_is_active(self.handle) }
    }

    pub fn is_static(&self) -> bool {
        unsafe { ffi::rphys_body_is_static(self.handle) }
    }

    pub fn is_dynamic(&self) -> bool {
        unsafe { ffi::rphys_body_is_dynamic(self.handle) }
    }

    pub fn is_kinematic(&self) -> bool {
        unsafe { ffi::rphys_body_is_kinematic(self.handle) }
    }

    pub fn is_sensor(&self) -> bool {
        unsafe { ffi::rphys_body_is_sensor(self.handle) }
    }
}

/// Shared lock on a physics system, held until released or dropped.
pub struct BodyLockRead<'a> {
    handle: RphysBodyLockRead,
    _system: PhantomData<&'a PhysicsSystem>,
}

impl BodyLockRead<'_> {
    /// # Safety
    ///
    /// `interface` must belong to a system outliving the lock.
    unsafe fn new(interface: RphysBodyLockInterface, id: BodyId) -> Self {
        Self {
            handle: unsafe { ffi::rphys_body_lock_read_create(interface, id.raw()) },
            _system: PhantomData,
        }
    }

    pub fn succeeded(&self) -> bool {
        unsafe { ffi::rphys_body_lock_read_succeeded(self.handle) }
    }

    pub fn succeeded_and_is_in_broad_phase(&self) -> bool {
        unsafe { ffi::rphys_body_lock_read_succeeded_and_is_in_broad_phase(self.handle) }
    }

    /// The locked body, `None` if not found or already released.
    pub fn body(&self) -> Option<Body<'_>> {
        let handle = unsafe { ffi::rphys_body_lock_read_get_body(self.handle) };
        handle.is_valid().then_some(Body {
            handle,
            _lock: PhantomData,
        })
    }

    pub fn release_lock(&mut self) {
        unsafe { ffi::rphys_body_lock_read_release_lock(self.handle) };
    }
}

impl Drop for BodyLockRead<'_> {
    fn drop(&mut self) {
        unsafe { ffi::rphys_body_lock_read_free(self.handle) };
    }
}

/// Exclusive lock on a physics system, held until released or dropped.
pub struct BodyLockWrite<'a> {
    handle: RphysBodyLockWrite,
    _system: PhantomData<&'a PhysicsSystem>,
}

impl BodyLockWrite<'_> {
    /// # Safety
    ///
    /// `interface` must belong to a system outliving the lock.
    unsafe fn new(interface: RphysBodyLockInterface, id: BodyId) -> Self {
        Self {
            handle: unsafe { ffi::rphys_body_lock_write_create(interface, id.raw()) },
            _system: PhantomData,
        }
    }

    pub fn succeeded(&self) -> bool {
        unsafe { ffi::rphys_body_lock_write_succeeded(self.handle) }
    }

    pub fn succeeded_and_is_in_broad_phase(&self) -> bool {
        unsafe { ffi::rphys_body_lock_write_succeeded_and_is_in_broad_phase(self.handle) }
    }

    pub fn body(&mut self) -> Option<Body<'_>> {
        let handle = unsafe { ffi::rphys_body_lock_write_get_body(self.handle) };
        handle.is_valid().then_some(Body {
            handle,
            _lock: PhantomData,
        })
    }

    pub fn release_lock(&mut self) {
        unsafe { ffi::rphys_body_lock_write_release_lock(self.handle) };
    }
}

impl Drop for BodyLockWrite<'_> {
    fn drop(&mut self) {
        unsafe { ffi::rphys_body_lock_write_free(self.handle) };
    }
}

/// Bounding-volume queries against the added bodies of a system.
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseQuery<'a> {
    handle: RphysBroadPhaseQuery,
    _system: PhantomData<&'a PhysicsSystem>,
}

impl BroadPhaseQuery<'_> {
    pub fn collide_aa_box(&self, min: Vec3, max: Vec3, collector: &mut impl Collector) {
        unsafe {
            ffi::rphys_broad_phase_query_collide_aa_box(
                self.handle,
                min.x,
                min.y,
                min.z,
                max.x,
                max.y,
                max.z,
                collector.collector_handle(),
            )
        };
    }

    pub fn collide_sphere(&self, center: Vec3, radius: f32, collector: &mut impl Collector) {
        unsafe {
            ffi::rphys_broad_phase_query_collide_sphere(
                self.handle,
                center.x,
                center.y,
                center.z,
                radius,
                collector.collector_handle(),
            )
        };
    }

    pub fn collide_point(&self, point: Vec3, collector: &mut impl Collector) {
        unsafe {
            ffi::rphys_broad_phase_query_collide_point(
                self.handle,
                point.x,
                point.y,
                point.z,
                collector.collector_handle(),
            )
        };
    }

    /// Cast a ray against body bounds. `direction` spans the whole ray.
    pub fn cast_ray(&self, origin: DVec3, direction: Vec3, collector: &mut impl CastRayCollector) {
        unsafe {
            ffi::rphys_broad_phase_query_cast_ray(
                self.handle,
                origin.x,
                origin.y,
                origin.z,
                direction.x,
                direction.y,
                direction.z,
                collector.cast_ray_collector_handle(),
            )
        };
    }
}

/// Exact-shape queries against the added bodies of a system.
#[derive(Debug, Clone, Copy)]
pub struct NarrowPhaseQuery<'a> {
    handle: RphysNarrowPhaseQuery,
    _system: PhantomData<&'a PhysicsSystem>,
}

impl NarrowPhaseQuery<'_> {
    /// Cast a ray against body shapes. `direction` spans the whole ray.
    pub fn cast_ray(&self, origin: DVec3, direction: Vec3, collector: &mut impl CastRayCollector) {
        unsafe {
            ffi::rphys_narrow_phase_query_cast_ray(
                self.handle,
                origin.x,
                origin.y,
                origin.z,
                direction.x,
                direction.y,
                direction.z,
                collector.cast_ray_collector_handle(),
            )
        };
    }
}
