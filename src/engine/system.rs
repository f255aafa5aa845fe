//! The physics system and the interfaces through which bodies are created,
//! locked and queried.
//!
//! All simulation state lives in one [`PhysicsWorld`] behind a reader-writer
//! lock. The system and every interface it hands out share that lock.
//! Interface calls lock for their own duration; [`BodyLockRead`] and
//! [`BodyLockWrite`] keep the lock until they are released, so a body view
//! can outlive the call that produced it.
//!
//! Reads take the lock recursively: a collector called back during a query
//! may read bodies again. Anything that writes (creating, adding or removing
//! bodies, stepping) must not run while the same thread holds a read lock.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

use glam::{DVec3, Quat, Vec3};
use parking_lot::RwLock;
use rapier3d::parry::query::RayCast;
use rapier3d::prelude::*;

use crate::engine::body::{pack_user_data, Body, BodyId};
use crate::engine::body_settings::BodyCreationSettings;
use crate::engine::collector::{BodyCollector, BroadPhaseCastResult, CastRayCollector};
use crate::engine::constraint::Constraint;
use crate::engine::math;
use crate::engine::refcount::{Ref, RefConst};
use crate::engine::result::ShapeResult;
use crate::engine::shape::Shape;
use crate::types::{Activation, MotionQuality, MotionType, OverrideMassProperties};

/// Bits returned by [`PhysicsSystem::update`].
pub mod update_error {
    pub const NONE: u32 = 0;
    pub const MANIFOLD_CACHE_FULL: u32 = 1 << 0;
    pub const BODY_PAIR_CACHE_FULL: u32 = 1 << 1;
    pub const CONTACT_CONSTRAINTS_FULL: u32 = 1 << 2;
}

/// Construction parameters of a [`PhysicsSystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsSettings {
    /// Bodies beyond this count are refused.
    pub max_bodies: u32,
    /// Touching pairs beyond this count set
    /// [`update_error::CONTACT_CONSTRAINTS_FULL`].
    pub max_contact_constraints: u32,
    pub gravity: Vec3,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            max_bodies: 1024,
            max_contact_constraints: 1024,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

struct BodyRecord {
    handle: RigidBodyHandle,
    shape: RefConst<Shape>,
}

struct ConstraintSlot {
    constraint: Ref<Constraint>,
    joint: Option<ImpulseJointHandle>,
}

/// Simulation state: the rapier pipeline plus the body and constraint
/// bookkeeping layered over it.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    query_pipeline: QueryPipeline,
    bodies: HashMap<u32, BodyRecord>,
    constraints: Vec<ConstraintSlot>,
    max_bodies: u32,
    max_contact_constraints: u32,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self {
            gravity: math::to_vector(settings.gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            bodies: HashMap::new(),
            constraints: Vec::new(),
            max_bodies: settings.max_bodies.min(BodyId::MAX_INDEX + 1),
            max_contact_constraints: settings.max_contact_constraints,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        math::from_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = math::to_vector(gravity);
    }

    pub fn num_bodies(&self) -> u32 {
        self.bodies.len() as u32
    }

    pub fn max_bodies(&self) -> u32 {
        self.max_bodies
    }

    /// Create a body outside the broad phase.
    ///
    /// Returns `None` when the body limit is reached or no shape can be
    /// obtained from the settings.
    pub fn create_body(&mut self, settings: &BodyCreationSettings) -> Option<BodyId> {
        if self.num_bodies() >= self.max_bodies {
            log::warn!("body limit of {} reached", self.max_bodies);
            return None;
        }
        let shape = resolve_shape(settings)?;

        let body_type = match settings.motion_type {
            MotionType::Static => RigidBodyType::Fixed,
            MotionType::Kinematic => RigidBodyType::KinematicVelocityBased,
            MotionType::Dynamic => RigidBodyType::Dynamic,
        };
        let rigid = RigidBodyBuilder::new(body_type)
            .position(math::location_to_isometry(settings.position, settings.rotation))
            .linvel(math::to_vector(settings.linear_velocity))
            .angvel(math::to_vector(settings.angular_velocity))
            .linear_damping(settings.linear_damping)
            .angular_damping(settings.angular_damping)
            .gravity_scale(settings.gravity_factor)
            .can_sleep(settings.allow_sleeping)
            .ccd_enabled(settings.motion_quality == MotionQuality::LinearCast)
            .enabled(false)
            .build();
        let handle = self.rigid_body_set.insert(rigid);
        let (index, generation) = handle.into_raw_parts();
        if index > BodyId::MAX_INDEX {
            self.remove_rigid_body(handle);
            log::warn!("body index {} exceeds the identifier range", index);
            return None;
        }
        let id = BodyId::new(index, generation as u8);
        if let Some(rigid) = self.rigid_body_set.get_mut(handle) {
            rigid.user_data = pack_user_data(
                id,
                settings.object_layer,
                settings.user_data,
                settings.is_sensor,
            );
        }

        if let Some(collision_shape) = shape.collision_shape() {
            let mut collider = ColliderBuilder::new(collision_shape)
                .friction(settings.friction)
                .restitution(settings.restitution)
                .sensor(settings.is_sensor)
                .user_data(id.raw() as u128);
            if settings.override_mass_properties != OverrideMassProperties::CalculateMassAndInertia
                && settings.mass_override > 0.0
            {
                collider = collider.mass(settings.mass_override);
            }
            self.collider_set
                .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);
        }

        self.bodies.insert(index, BodyRecord { handle, shape });
        self.query_pipeline.update(&self.collider_set);
        log::debug!("created {:?}", id);
        Some(id)
    }

    fn record(&self, id: BodyId) -> Option<&BodyRecord> {
        let record = self.bodies.get(&id.index())?;
        let rigid = self.rigid_body_set.get(record.handle)?;
        (Body::from_rigid_body(rigid).id() == id).then_some(record)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        let record = self.record(id)?;
        self.rigid_body_set.get(record.handle).map(Body::from_rigid_body)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let handle = self.record(id)?.handle;
        self.rigid_body_set.get_mut(handle).map(Body::from_rigid_body_mut)
    }

    /// The shape the body was created with.
    pub fn shape(&self, id: BodyId) -> Option<RefConst<Shape>> {
        self.record(id).map(|record| record.shape.clone())
    }

    fn set_in_broad_phase(&mut self, id: BodyId, added: bool) -> bool {
        let Some(handle) = self.record(id).map(|record| record.handle) else {
            return false;
        };
        let Some(rigid) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        rigid.set_enabled(added);
        let colliders: Vec<ColliderHandle> = rigid.colliders().to_vec();
        for collider in colliders {
            if let Some(collider) = self.collider_set.get_mut(collider) {
                collider.set_enabled(added);
            }
        }
        self.query_pipeline.update(&self.collider_set);
        true
    }

    /// Put the body in the broad phase so it simulates and shows up in
    /// queries.
    pub fn add_body(&mut self, id: BodyId, activation: Activation) {
        if !self.set_in_broad_phase(id, true) {
            log::warn!("add_body: unknown {:?}", id);
            return;
        }
        if activation == Activation::Activate {
            self.activate_body(id);
        }
    }

    /// Take the body out of the broad phase; it keeps existing.
    pub fn remove_body(&mut self, id: BodyId) {
        if !self.set_in_broad_phase(id, false) {
            log::warn!("remove_body: unknown {:?}", id);
        }
    }

    pub fn is_added(&self, id: BodyId) -> bool {
        self.body(id).is_some_and(Body::is_in_broad_phase)
    }

    /// Destroy the body, releasing its shape and any joint attached to it.
    pub fn destroy_body(&mut self, id: BodyId) {
        let Some(handle) = self.record(id).map(|record| record.handle) else {
            log::warn!("destroy_body: unknown {:?}", id);
            return;
        };
        self.remove_rigid_body(handle);
        self.bodies.remove(&id.index());
        for slot in &mut self.constraints {
            if slot.constraint.body1() == id || slot.constraint.body2() == id {
                slot.joint = None;
            }
        }
        self.query_pipeline.update(&self.collider_set);
        log::debug!("destroyed {:?}", id);
    }

    fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    pub fn activate_body(&mut self, id: BodyId) {
        let Some(handle) = self.record(id).map(|record| record.handle) else {
            return;
        };
        if let Some(rigid) = self.rigid_body_set.get_mut(handle) {
            rigid.wake_up(true);
        }
    }

    pub fn add_constraint(&mut self, constraint: Ref<Constraint>) {
        let mut slot = ConstraintSlot {
            constraint,
            joint: None,
        };
        self.sync_constraint(&mut slot);
        self.constraints.push(slot);
    }

    /// Remove `constraint`, dropping the reference the system held.
    pub fn remove_constraint(&mut self, constraint: &Constraint) {
        let Some(position) = self
            .constraints
            .iter()
            .position(|slot| std::ptr::eq(&*slot.constraint, constraint))
        else {
            log::warn!("remove_constraint: {:?} is not in the system", constraint);
            return;
        };
        let slot = self.constraints.remove(position);
        if let Some(joint) = slot.joint {
            self.impulse_joint_set.remove(joint, true);
        }
    }

    pub fn num_constraints(&self) -> u32 {
        self.constraints.len() as u32
    }

    fn sync_constraint(&mut self, slot: &mut ConstraintSlot) {
        let wanted = slot.constraint.is_enabled();
        match (wanted, slot.joint) {
            (true, None) => {
                let handles = (
                    self.record(slot.constraint.body1()).map(|r| r.handle),
                    self.record(slot.constraint.body2()).map(|r| r.handle),
                );
                if let (Some(h1), Some(h2)) = handles {
                    slot.joint = Some(self.impulse_joint_set.insert(
                        h1,
                        h2,
                        slot.constraint.joint(),
                        true,
                    ));
                }
            }
            (false, Some(joint)) => {
                self.impulse_joint_set.remove(joint, true);
                slot.joint = None;
            }
            _ => {}
        }
    }

    fn sync_constraints(&mut self) {
        let mut slots = mem::take(&mut self.constraints);
        for slot in &mut slots {
            self.sync_constraint(slot);
        }
        self.constraints = slots;
    }

    /// Advance the simulation by `delta_time`, split over `collision_steps`
    /// steps. Returns [`update_error`] bits.
    pub fn update(&mut self, delta_time: f32, collision_steps: u32) -> u32 {
        if collision_steps == 0 || delta_time <= 0.0 {
            return update_error::NONE;
        }
        self.sync_constraints();
        self.integration_parameters.dt = delta_time / collision_steps as f32;
        for _ in 0..collision_steps {
            self.physics_pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }

        let touching = self
            .narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .count() as u32;
        if touching > self.max_contact_constraints {
            log::warn!(
                "{} touching pairs exceed the limit of {}",
                touching,
                self.max_contact_constraints
            );
            return update_error::CONTACT_CONSTRAINTS_FULL;
        }
        update_error::NONE
    }

    /// Rebuild the query acceleration structure from scratch.
    pub fn optimize_broad_phase(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    fn query_aabb(
        &self,
        aabb: Aabb,
        collector: &mut dyn BodyCollector,
        mut accept: impl FnMut(&Aabb) -> bool,
    ) {
        if collector.should_early_out() {
            return;
        }
        self.query_pipeline
            .colliders_with_aabb_intersecting_aabb(&aabb, |handle| {
                let Some(collider) = self.collider_set.get(*handle) else {
                    return true;
                };
                let Some(rigid) = collider.parent().and_then(|p| self.rigid_body_set.get(p)) else {
                    return true;
                };
                if rigid.is_enabled() && accept(&collider.compute_aabb()) {
                    collector.add_hit(Body::from_rigid_body(rigid).id());
                }
                !collector.should_early_out()
            });
    }

    /// Report every added body whose bounds overlap the box.
    pub fn collide_aabox(&self, min: Vec3, max: Vec3, collector: &mut dyn BodyCollector) {
        let aabb = Aabb::new(math::to_point(min), math::to_point(max));
        self.query_aabb(aabb, collector, |_| true);
    }

    /// Report every added body whose bounds overlap the sphere.
    pub fn collide_sphere(&self, center: Vec3, radius: f32, collector: &mut dyn BodyCollector) {
        let aabb = Aabb::new(
            math::to_point(center - Vec3::splat(radius)),
            math::to_point(center + Vec3::splat(radius)),
        );
        self.query_aabb(aabb, collector, |bounds| {
            let closest = center.clamp(math::from_point(&bounds.mins), math::from_point(&bounds.maxs));
            closest.distance_squared(center) <= radius * radius
        });
    }

    /// Report every added body whose bounds contain the point.
    pub fn collide_point(&self, point: Vec3, collector: &mut dyn BodyCollector) {
        let aabb = Aabb::new(math::to_point(point), math::to_point(point));
        self.query_aabb(aabb, collector, |bounds| {
            point.cmpge(math::from_point(&bounds.mins)).all()
                && point.cmple(math::from_point(&bounds.maxs)).all()
        });
    }

    fn added_body(&self, handle: ColliderHandle) -> Option<BodyId> {
        let collider = self.collider_set.get(handle)?;
        let rigid = self.rigid_body_set.get(collider.parent()?)?;
        rigid
            .is_enabled()
            .then(|| Body::from_rigid_body(rigid).id())
    }

    /// Report every added body whose bounds the ray crosses. The fraction is
    /// where the ray enters the bounds.
    pub fn cast_ray_bounds(&self, origin: DVec3, direction: Vec3, collector: &mut dyn CastRayCollector) {
        if collector.should_early_out() {
            return;
        }
        let start = origin.as_vec3();
        let end = start + direction;
        let ray = Ray::new(math::to_point(start), math::to_vector(direction));
        let swept = Aabb::new(math::to_point(start.min(end)), math::to_point(start.max(end)));
        self.query_pipeline
            .colliders_with_aabb_intersecting_aabb(&swept, |handle| {
                let Some(body_id) = self.added_body(*handle) else {
                    return true;
                };
                let Some(collider) = self.collider_set.get(*handle) else {
                    return true;
                };
                if let Some(fraction) = collider.compute_aabb().cast_local_ray(&ray, 1.0, true) {
                    collector.add_hit(BroadPhaseCastResult { body_id, fraction });
                }
                !collector.should_early_out()
            });
    }

    /// Report every added body whose shape the ray hits. A ray starting
    /// inside a shape hits it at fraction zero.
    pub fn cast_ray(&self, origin: DVec3, direction: Vec3, collector: &mut dyn CastRayCollector) {
        if collector.should_early_out() {
            return;
        }
        let ray = Ray::new(math::to_point(origin.as_vec3()), math::to_vector(direction));
        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
            |handle, intersection| {
                if let Some(body_id) = self.added_body(handle) {
                    collector.add_hit(BroadPhaseCastResult {
                        body_id,
                        fraction: intersection.time_of_impact,
                    });
                }
                !collector.should_early_out()
            },
        );
    }
}

fn resolve_shape(settings: &BodyCreationSettings) -> Option<RefConst<Shape>> {
    if let Some(shape) = settings.shape() {
        return Some(shape.clone());
    }
    let Some(shape_settings) = settings.shape_settings() else {
        log::warn!("body settings carry no shape");
        return None;
    };
    match shape_settings.create() {
        ShapeResult::Valid(shape) => Some(shape.to_const()),
        ShapeResult::Error(message) => {
            log::warn!("shape creation failed: {}", message);
            None
        }
        ShapeResult::Empty => None,
    }
}

type SharedWorld = Arc<RwLock<PhysicsWorld>>;

/// Creates, adds, removes and inspects bodies by id.
pub struct BodyInterface {
    world: SharedWorld,
}

impl BodyInterface {
    fn read<R>(&self, f: impl FnOnce(&PhysicsWorld) -> R) -> R {
        f(&self.world.read_recursive())
    }

    fn write<R>(&self, f: impl FnOnce(&mut PhysicsWorld) -> R) -> R {
        f(&mut self.world.write())
    }

    fn read_body<R: Default>(&self, id: BodyId, f: impl FnOnce(&Body) -> R) -> R {
        self.read(|world| world.body(id).map(f).unwrap_or_default())
    }

    /// Create a body; `None` when the body limit is reached.
    pub fn create_body(&self, settings: &BodyCreationSettings) -> Option<BodyId> {
        self.write(|world| world.create_body(settings))
    }

    /// Like [`create_body`](Self::create_body) but also returns a view of the
    /// new body.
    ///
    /// The view stays valid until the body is destroyed or another body is
    /// created.
    pub(crate) fn create_body_view(&self, settings: &BodyCreationSettings) -> Option<NonNull<Body>> {
        self.write(|world| {
            let id = world.create_body(settings)?;
            world.body(id).map(NonNull::from)
        })
    }

    /// Create a body and add it; [`BodyId::INVALID`] on failure.
    pub fn create_and_add_body(&self, settings: &BodyCreationSettings, activation: Activation) -> BodyId {
        self.write(|world| match world.create_body(settings) {
            Some(id) => {
                world.add_body(id, activation);
                id
            }
            None => BodyId::INVALID,
        })
    }

    pub fn add_body(&self, id: BodyId, activation: Activation) {
        self.write(|world| world.add_body(id, activation));
    }

    pub fn remove_body(&self, id: BodyId) {
        self.write(|world| world.remove_body(id));
    }

    pub fn destroy_body(&self, id: BodyId) {
        self.write(|world| world.destroy_body(id));
    }

    pub fn is_added(&self, id: BodyId) -> bool {
        self.read(|world| world.is_added(id))
    }

    pub fn position(&self, id: BodyId) -> DVec3 {
        self.read_body(id, Body::position)
    }

    pub fn rotation(&self, id: BodyId) -> Quat {
        self.read(|world| world.body(id).map_or(Quat::IDENTITY, Body::rotation))
    }

    pub fn linear_velocity(&self, id: BodyId) -> Vec3 {
        self.read_body(id, Body::linear_velocity)
    }

    pub fn set_linear_velocity(&self, id: BodyId, velocity: Vec3) {
        self.write(|world| {
            if let Some(body) = world.body_mut(id) {
                body.set_linear_velocity(velocity);
            }
        });
    }

    pub fn user_data(&self, id: BodyId) -> u64 {
        self.read_body(id, Body::user_data)
    }

    pub fn object_layer(&self, id: BodyId) -> u16 {
        self.read_body(id, Body::object_layer)
    }

    pub fn motion_type(&self, id: BodyId) -> MotionType {
        self.read_body(id, Body::motion_type)
    }

    pub fn shape(&self, id: BodyId) -> Option<RefConst<Shape>> {
        self.read(|world| world.shape(id))
    }

    pub fn is_active(&self, id: BodyId) -> bool {
        self.read_body(id, Body::is_active)
    }

    pub fn activate_body(&self, id: BodyId) {
        self.write(|world| world.activate_body(id));
    }
}

/// Source of [`BodyLockRead`] and [`BodyLockWrite`].
///
/// The interface from [`PhysicsSystem::body_lock_interface_no_lock`] looks
/// bodies up without keeping any lock.
pub struct BodyLockInterface {
    world: SharedWorld,
    locking: bool,
}

impl BodyLockInterface {
    pub fn lock_read(&self, id: BodyId) -> BodyLockRead {
        BodyLockRead::new(self, id)
    }

    pub fn lock_write(&self, id: BodyId) -> BodyLockWrite {
        BodyLockWrite::new(self, id)
    }
}

/// Holds the world read lock until released, exposing one body.
pub struct BodyLockRead {
    world: SharedWorld,
    body: Option<NonNull<Body>>,
    held: bool,
}

impl BodyLockRead {
    pub fn new(interface: &BodyLockInterface, id: BodyId) -> Self {
        let guard = interface.world.read_recursive();
        let body = guard.body(id).map(NonNull::from);
        if interface.locking {
            // Released by release_lock.
            mem::forget(guard);
        }
        Self {
            world: interface.world.clone(),
            body,
            held: interface.locking,
        }
    }

    /// Whether the body was found.
    pub fn succeeded(&self) -> bool {
        self.body.is_some()
    }

    pub fn succeeded_and_is_in_broad_phase(&self) -> bool {
        self.body().is_some_and(Body::is_in_broad_phase)
    }

    /// The locked body, `None` if it was not found or the lock is released.
    pub fn body(&self) -> Option<&Body> {
        // SAFETY: while the read lock is held no writer can move or free the body.
        self.body.map(|body| unsafe { body.as_ref() })
    }

    pub fn release_lock(&mut self) {
        self.body = None;
        if self.held {
            self.held = false;
            // SAFETY: this lock object took exactly one read lock in `new`.
            unsafe { self.world.force_unlock_read() };
        }
    }
}

impl Drop for BodyLockRead {
    fn drop(&mut self) {
        self.release_lock();
    }
}

impl fmt::Debug for BodyLockRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyLockRead")
            .field("body", &self.body())
            .field("held", &self.held)
            .finish()
    }
}

/// Holds the world write lock until released, exposing one body mutably.
pub struct BodyLockWrite {
    world: SharedWorld,
    body: Option<NonNull<Body>>,
    held: bool,
}

impl BodyLockWrite {
    pub fn new(interface: &BodyLockInterface, id: BodyId) -> Self {
        let mut guard = interface.world.write();
        let body = guard.body_mut(id).map(NonNull::from);
        if interface.locking {
            mem::forget(guard);
        }
        Self {
            world: interface.world.clone(),
            body,
            held: interface.locking,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.body.is_some()
    }

    pub fn succeeded_and_is_in_broad_phase(&self) -> bool {
        self.body().is_some_and(Body::is_in_broad_phase)
    }

    pub fn body(&self) -> Option<&Body> {
        // SAFETY: the write lock is held, no other access exists.
        self.body.map(|body| unsafe { body.as_ref() })
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        // SAFETY: as above.
        self.body.map(|mut body| unsafe { body.as_mut() })
    }

    pub fn release_lock(&mut self) {
        self.body = None;
        if self.held {
            self.held = false;
            // SAFETY: this lock object took the write lock in `new`.
            unsafe { self.world.force_unlock_write() };
        }
    }
}

impl Drop for BodyLockWrite {
    fn drop(&mut self) {
        self.release_lock();
    }
}

impl fmt::Debug for BodyLockWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyLockWrite")
            .field("body", &self.body())
            .field("held", &self.held)
            .finish()
    }
}

/// Bounding-volume queries against added bodies.
pub struct BroadPhaseQuery {
    world: SharedWorld,
}

impl BroadPhaseQuery {
    pub fn collide_aabox(&self, min: Vec3, max: Vec3, collector: &mut dyn BodyCollector) {
        self.world.read_recursive().collide_aabox(min, max, collector);
    }

    pub fn collide_sphere(&self, center: Vec3, radius: f32, collector: &mut dyn BodyCollector) {
        self.world
            .read_recursive()
            .collide_sphere(center, radius, collector);
    }

    pub fn collide_point(&self, point: Vec3, collector: &mut dyn BodyCollector) {
        self.world.read_recursive().collide_point(point, collector);
    }

    /// Cast a ray against body bounds. `direction` spans the whole ray.
    pub fn cast_ray(&self, origin: DVec3, direction: Vec3, collector: &mut dyn CastRayCollector) {
        self.world
            .read_recursive()
            .cast_ray_bounds(origin, direction, collector);
    }
}

/// Exact-shape queries against added bodies.
pub struct NarrowPhaseQuery {
    world: SharedWorld,
}

impl NarrowPhaseQuery {
    /// Cast a ray against body shapes. `direction` spans the whole ray.
    pub fn cast_ray(&self, origin: DVec3, direction: Vec3, collector: &mut dyn CastRayCollector) {
        self.world
            .read_recursive()
            .cast_ray(origin, direction, collector);
    }
}

/// A physics simulation.
///
/// The interfaces returned by the accessors are views into the system and
/// share its lifetime.
#[repr(C)]
pub struct PhysicsSystem {
    // First field: the interfaces below never sit at the system's address.
    world: SharedWorld,
    body_interface: BodyInterface,
    body_lock_interface: BodyLockInterface,
    body_lock_interface_no_lock: BodyLockInterface,
    broad_phase_query: BroadPhaseQuery,
    narrow_phase_query: NarrowPhaseQuery,
}

impl PhysicsSystem {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let world = Arc::new(RwLock::new(PhysicsWorld::new(settings)));
        log::debug!("physics system with {} bodies max", settings.max_bodies);
        Self {
            body_interface: BodyInterface {
                world: world.clone(),
            },
            body_lock_interface: BodyLockInterface {
                world: world.clone(),
                locking: true,
            },
            body_lock_interface_no_lock: BodyLockInterface {
                world: world.clone(),
                locking: false,
            },
            broad_phase_query: BroadPhaseQuery {
                world: world.clone(),
            },
            narrow_phase_query: NarrowPhaseQuery {
                world: world.clone(),
            },
            world,
        }
    }

    /// A system with default settings and room for `max_bodies` bodies.
    pub fn with_max_bodies(max_bodies: u32) -> Self {
        Self::new(&PhysicsSettings {
            max_bodies,
            ..PhysicsSettings::default()
        })
    }

    pub fn gravity(&self) -> Vec3 {
        self.world.read_recursive().gravity()
    }

    pub fn set_gravity(&self, gravity: Vec3) {
        self.world.write().set_gravity(gravity);
    }

    pub fn num_bodies(&self) -> u32 {
        self.world.read_recursive().num_bodies()
    }

    pub fn max_bodies(&self) -> u32 {
        self.world.read_recursive().max_bodies()
    }

    pub fn update(&self, delta_time: f32, collision_steps: u32) -> u32 {
        self.world.write().update(delta_time, collision_steps)
    }

    pub fn optimize_broad_phase(&self) {
        self.world.write().optimize_broad_phase();
    }

    pub fn add_constraint(&self, constraint: Ref<Constraint>) {
        self.world.write().add_constraint(constraint);
    }

    pub fn remove_constraint(&self, constraint: &Constraint) {
        self.world.write().remove_constraint(constraint);
    }

    pub fn num_constraints(&self) -> u32 {
        self.world.read_recursive().num_constraints()
    }

    pub fn body_interface(&self) -> &BodyInterface {
        &self.body_interface
    }

    pub fn body_lock_interface(&self) -> &BodyLockInterface {
        &self.body_lock_interface
    }

    /// Lock interface whose locks look bodies up without locking.
    ///
    /// # Safety
    ///
    /// While a lock object from this interface is alive, nothing may modify
    /// the system: no body creation, removal or stepping, on any thread.
    pub unsafe fn body_lock_interface_no_lock(&self) -> &BodyLockInterface {
        &self.body_lock_interface_no_lock
    }

    pub fn broad_phase_query(&self) -> &BroadPhaseQuery {
        &self.broad_phase_query
    }

    pub fn narrow_phase_query(&self) -> &NarrowPhaseQuery {
        &self.narrow_phase_query
    }
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new(&PhysicsSettings::default())
    }
}

impl fmt::Debug for PhysicsSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsSystem")
            .field("num_bodies", &self.num_bodies())
            .field("max_bodies", &self.max_bodies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collector::{AllHitCastRayCollector, AllHitCollector, AnyHitCastRayCollector, AnyHitCollector};

    fn sphere_settings(position: DVec3, motion_type: MotionType) -> BodyCreationSettings {
        let shape = Shape::sphere(0.5).get().to_const();
        BodyCreationSettings::from_shape(shape, position, Quat::IDENTITY, motion_type, 1)
    }

    #[test]
    fn test_create_add_remove() {
        let system = PhysicsSystem::with_max_bodies(4);
        let bi = system.body_interface();
        let id = bi.create_body(&sphere_settings(DVec3::ZERO, MotionType::Dynamic)).unwrap();
        assert_eq!(system.num_bodies(), 1);
        assert!(!bi.is_added(id));

        bi.add_body(id, Activation::Activate);
        assert!(bi.is_added(id));
        assert_eq!(bi.object_layer(id), 1);
        assert_eq!(bi.motion_type(id), MotionType::Dynamic);

        bi.remove_body(id);
        assert!(!bi.is_added(id));
        bi.destroy_body(id);
        assert_eq!(system.num_bodies(), 0);
        assert_eq!(bi.position(id), DVec3::ZERO);
    }

    #[test]
    fn test_body_limit() {
        let system = PhysicsSystem::with_max_bodies(1);
        let bi = system.body_interface();
        let settings = sphere_settings(DVec3::ZERO, MotionType::Static);
        assert!(bi.create_body(&settings).is_some());
        assert!(bi.create_body(&settings).is_none());
        assert!(bi
            .create_and_add_body(&settings, Activation::DontActivate)
            .is_invalid());
    }

    #[test]
    fn test_missing_shape_refused() {
        let system = PhysicsSystem::default();
        assert!(system
            .body_interface()
            .create_body(&BodyCreationSettings::default())
            .is_none());
    }

    #[test]
    fn test_body_falls() {
        let system = PhysicsSystem::default();
        let bi = system.body_interface();
        let id = bi.create_and_add_body(
            &sphere_settings(DVec3::new(0.0, 10.0, 0.0), MotionType::Dynamic),
            Activation::Activate,
        );
        for _ in 0..10 {
            assert_eq!(system.update(1.0 / 60.0, 1), update_error::NONE);
        }
        assert!(bi.position(id).y < 10.0);
        assert!(bi.linear_velocity(id).y < 0.0);
    }

    #[test]
    fn test_queries_skip_bodies_outside_broad_phase() {
        let system = PhysicsSystem::default();
        let bi = system.body_interface();
        let added = bi.create_and_add_body(
            &sphere_settings(DVec3::ZERO, MotionType::Static),
            Activation::DontActivate,
        );
        let _hidden = bi
            .create_body(&sphere_settings(DVec3::new(0.2, 0.0, 0.0), MotionType::Static))
            .unwrap();

        let mut all = AllHitCollector::new();
        system
            .broad_phase_query()
            .collide_aabox(Vec3::splat(-1.0), Vec3::splat(1.0), &mut all);
        assert_eq!(all.hits(), &[added]);

        let mut any = AnyHitCollector::new();
        system
            .broad_phase_query()
            .collide_point(Vec3::new(5.0, 5.0, 5.0), &mut any);
        assert!(!any.had_hit());

        system
            .broad_phase_query()
            .collide_sphere(Vec3::new(0.0, 1.2, 0.0), 1.0, &mut any);
        assert_eq!(any.hit(), Some(added));
    }

    #[test]
    fn test_read_lock_is_recursive() {
        let system = PhysicsSystem::default();
        let id = system.body_interface().create_and_add_body(
            &sphere_settings(DVec3::new(1.0, 2.0, 3.0), MotionType::Static),
            Activation::DontActivate,
        );
        let mut lock = system.body_lock_interface().lock_read(id);
        assert!(lock.succeeded_and_is_in_broad_phase());
        // Reading through the body interface while the lock is held.
        assert_eq!(system.body_interface().position(id), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(lock.body().map(Body::id), Some(id));
        lock.release_lock();
        assert!(lock.body().is_none());
        lock.release_lock();

        let mut write = system.body_lock_interface().lock_write(id);
        write.body_mut().unwrap().set_user_data(99);
        drop(write);
        assert_eq!(system.body_interface().user_data(id), 99);
    }

    #[test]
    fn test_constraint_lifecycle() {
        use crate::engine::constraint::ConstraintSettings;

        let system = PhysicsSystem::default();
        let bi = system.body_interface();
        let a = bi.create_and_add_body(
            &sphere_settings(DVec3::ZERO, MotionType::Static),
            Activation::DontActivate,
        );
        let b = bi.create_and_add_body(
            &sphere_settings(DVec3::new(0.0, 2.0, 0.0), MotionType::Dynamic),
            Activation::Activate,
        );
        let lock_a = system.body_lock_interface().lock_read(a);
        let lock_b = system.body_lock_interface().lock_read(b);
        let constraint = Ref::new(
            ConstraintSettings::fixed().create(lock_a.body().unwrap(), lock_b.body().unwrap()),
        );
        drop(lock_a);
        drop(lock_b);

        system.add_constraint(constraint.clone());
        assert_eq!(system.num_constraints(), 1);
        assert_eq!(constraint.ref_count(), 2);
        for _ in 0..30 {
            system.update(1.0 / 60.0, 1);
        }
        assert!((bi.position(b).y - 2.0).abs() < 0.1, "fixed body should hold");

        system.remove_constraint(&constraint);
        assert_eq!(system.num_constraints(), 0);
        assert_eq!(constraint.ref_count(), 1);
    }

    fn row_of_spheres(system: &PhysicsSystem) -> Vec<BodyId> {
        [6.0, 2.0, 4.0]
            .iter()
            .map(|x| {
                system.body_interface().create_and_add_body(
                    &sphere_settings(DVec3::new(*x, 0.0, 0.0), MotionType::Static),
                    Activation::DontActivate,
                )
            })
            .collect()
    }

    #[test]
    fn test_narrow_phase_ray_fractions() {
        let system = PhysicsSystem::default();
        let ids = row_of_spheres(&system);
        let query = system.narrow_phase_query();

        let mut all = AllHitCastRayCollector::new();
        query.cast_ray(DVec3::ZERO, Vec3::new(10.0, 0.0, 0.0), &mut all);
        assert_eq!(all.hits().len(), 3);
        all.sort();
        let order: Vec<BodyId> = all.hits().iter().map(|hit| hit.body_id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]], "nearest first");
        // The sphere at x = 2 has radius 0.5, so the ray enters at x = 1.5.
        assert!((all.hits()[0].fraction - 0.15).abs() < 1e-4);

        let mut short = AllHitCastRayCollector::new();
        query.cast_ray(DVec3::ZERO, Vec3::new(1.0, 0.0, 0.0), &mut short);
        assert!(!short.had_hit(), "the ray ends before the first sphere");

        let mut any = AnyHitCastRayCollector::new();
        query.cast_ray(DVec3::new(4.0, 5.0, 0.0), Vec3::new(0.0, -10.0, 0.0), &mut any);
        let hit = any.hit().unwrap();
        assert_eq!(hit.body_id, ids[2]);
        assert!((hit.fraction - 0.45).abs() < 1e-4);
    }

    #[test]
    fn test_broad_phase_ray_uses_bounds() {
        let system = PhysicsSystem::default();
        let ids = row_of_spheres(&system);

        // Passes the corner of the bounds of the sphere at x = 2 but misses the sphere.
        let origin = DVec3::new(2.45, 0.45, -5.0);
        let direction = Vec3::new(0.0, 0.0, 10.0);

        let mut bounds = AllHitCastRayCollector::new();
        system.broad_phase_query().cast_ray(origin, direction, &mut bounds);
        assert_eq!(bounds.hits().iter().map(|h| h.body_id).collect::<Vec<_>>(), vec![ids[1]]);
        assert!((bounds.hits()[0].fraction - 0.45).abs() < 1e-4);

        let mut shapes = AllHitCastRayCollector::new();
        system.narrow_phase_query().cast_ray(origin, direction, &mut shapes);
        assert!(!shapes.had_hit());
    }

    #[test]
    fn test_no_lock_interface_takes_no_lock() {
        let system = PhysicsSystem::default();
        let id = system.body_interface().create_and_add_body(
            &sphere_settings(DVec3::new(0.0, 1.0, 0.0), MotionType::Static),
            Activation::DontActivate,
        );
        let interface = unsafe { system.body_lock_interface_no_lock() };
        let mut lock = interface.lock_read(id);
        assert!(lock.succeeded());
        assert!(!system.world.is_locked(), "no lock should be held");
        assert_eq!(lock.body().map(Body::id), Some(id));
        lock.release_lock();
        assert!(!lock.succeeded());

        let mut write = interface.lock_write(id);
        assert!(!system.world.is_locked());
        write.body_mut().unwrap().set_user_data(5);
        drop(write);
        assert_eq!(system.body_interface().user_data(id), 5);

        let held = system.body_lock_interface().lock_read(id);
        assert!(system.world.is_locked());
        drop(held);
        assert!(!system.world.is_locked());
    }
}
