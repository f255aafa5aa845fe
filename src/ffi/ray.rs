//! Exported functions for ray casts, their collectors and results.
//!
//! Ray origins are locations and cross as doubles; directions are floats and
//! span the whole ray, so a hit fraction of 1 is the end of the ray.

use glam::{DVec3, Vec3};

use crate::engine::{AllHitCastRayCollector, AnyHitCastRayCollector, BroadPhaseCastResult, CastRayCollector};
use crate::ffi::handles::*;

/// A ray-cast collector of any kind, as seen through a handle.
pub enum HostCastRayCollector {
    AllHit(AllHitCastRayCollector),
    AnyHit(AnyHitCastRayCollector),
}

impl HostCastRayCollector {
    fn inner_mut(&mut self) -> &mut dyn CastRayCollector {
        match self {
            HostCastRayCollector::AllHit(c) => c,
            HostCastRayCollector::AnyHit(c) => c,
        }
    }
}

impl CastRayCollector for HostCastRayCollector {
    fn add_hit(&mut self, hit: BroadPhaseCastResult) {
        self.inner_mut().add_hit(hit)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn should_early_out(&self) -> bool {
        match self {
            HostCastRayCollector::AllHit(c) => c.should_early_out(),
            HostCastRayCollector::AnyHit(c) => c.should_early_out(),
        }
    }

    fn force_early_out(&mut self) {
        self.inner_mut().force_early_out()
    }
}

fn all_hit<'a>(collector: RphysAllHitCastRayCollector) -> &'a mut AllHitCastRayCollector {
    match unsafe { collector.get_mut() } {
        HostCastRayCollector::AllHit(c) => c,
        _ => panic!("{:?} is not an all-hit ray collector", collector),
    }
}

fn any_hit<'a>(collector: RphysAnyHitCastRayCollector) -> &'a mut AnyHitCastRayCollector {
    match unsafe { collector.get_mut() } {
        HostCastRayCollector::AnyHit(c) => c,
        _ => panic!("{:?} is not an any-hit ray collector", collector),
    }
}

// ============================================================================
// BroadPhaseCastResult
// ============================================================================

/// A result for the invalid body at fraction 0.
#[no_mangle]
pub extern "C" fn rphys_broad_phase_cast_result_create_default() -> RphysBroadPhaseCastResult {
    RphysBroadPhaseCastResult::new_owned(BroadPhaseCastResult::default())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_broad_phase_cast_result_free(result: RphysBroadPhaseCastResult) {
    unsafe { result.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_broad_phase_cast_result_get_body_id(result: RphysBroadPhaseCastResult) -> u32 {
    unsafe { result.get() }.body_id.raw()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_broad_phase_cast_result_get_fraction(result: RphysBroadPhaseCastResult) -> f32 {
    unsafe { result.get() }.fraction
}

// ============================================================================
// All hits
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_all_hit_cast_ray_collector_create_default() -> RphysAllHitCastRayCollector {
    RphysAllHitCastRayCollector::new_owned(HostCastRayCollector::AllHit(AllHitCastRayCollector::new()))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_cast_ray_collector_free(collector: RphysAllHitCastRayCollector) {
    unsafe { collector.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_cast_ray_collector_count_hits(collector: RphysAllHitCastRayCollector) -> u32 {
    all_hit(collector).hits().len() as u32
}

/// A copy of hit `index`; free it with `rphys_broad_phase_cast_result_free`.
#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_cast_ray_collector_get_hit(
    collector: RphysAllHitCastRayCollector,
    index: u32,
) -> RphysBroadPhaseCastResult {
    RphysBroadPhaseCastResult::new_owned(all_hit(collector).hits()[index as usize])
}

/// Order the hits by increasing fraction.
#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_cast_ray_collector_sort(collector: RphysAllHitCastRayCollector) {
    all_hit(collector).sort();
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_cast_ray_collector_reset(collector: RphysAllHitCastRayCollector) {
    all_hit(collector).reset();
}

// ============================================================================
// Any hit
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_any_hit_cast_ray_collector_create_default() -> RphysAnyHitCastRayCollector {
    RphysAnyHitCastRayCollector::new_owned(HostCastRayCollector::AnyHit(AnyHitCastRayCollector::new()))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_cast_ray_collector_free(collector: RphysAnyHitCastRayCollector) {
    unsafe { collector.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_cast_ray_collector_had_hit(collector: RphysAnyHitCastRayCollector) -> bool {
    any_hit(collector).had_hit()
}

/// A copy of the hit, or null when there was none.
#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_cast_ray_collector_get_hit(
    collector: RphysAnyHitCastRayCollector,
) -> RphysBroadPhaseCastResult {
    match any_hit(collector).hit() {
        Some(hit) => RphysBroadPhaseCastResult::new_owned(hit),
        None => RphysBroadPhaseCastResult::invalid(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_cast_ray_collector_reset(collector: RphysAnyHitCastRayCollector) {
    any_hit(collector).reset();
}

// ============================================================================
// Queries
// ============================================================================

/// Cast a ray against the bounds of the added bodies.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_broad_phase_query_cast_ray(
    query: RphysBroadPhaseQuery,
    origin_x: f64,
    origin_y: f64,
    origin_z: f64,
    direction_x: f32,
    direction_y: f32,
    direction_z: f32,
    collector: RphysCastRayCollector,
) {
    unsafe { query.get() }.cast_ray(
        DVec3::new(origin_x, origin_y, origin_z),
        Vec3::new(direction_x, direction_y, direction_z),
        unsafe { collector.get_mut() },
    );
}

/// Cast a ray against the shapes of the added bodies.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rphys_narrow_phase_query_cast_ray(
    query: RphysNarrowPhaseQuery,
    origin_x: f64,
    origin_y: f64,
    origin_z: f64,
    direction_x: f32,
    direction_y: f32,
    direction_z: f32,
    collector: RphysCastRayCollector,
) {
    unsafe { query.get() }.cast_ray(
        DVec3::new(origin_x, origin_y, origin_z),
        Vec3::new(direction_x, direction_y, direction_z),
        unsafe { collector.get_mut() },
    );
}
