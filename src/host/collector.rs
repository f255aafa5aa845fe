//! Collectors for broad-phase queries and ray casts.

use crate::bridge::RphysHostRuntime;
use crate::engine::{BodyId, BroadPhaseCastResult};
use crate::error::Result;
use crate::ffi::{
    self, RphysAllHitCastRayCollector, RphysAllHitCollector, RphysAnyHitCastRayCollector, RphysAnyHitCollector,
    RphysBroadPhaseCastResult, RphysCastRayCollector, RphysCollector, RphysCustomCollector,
};

/// Anything a [`BroadPhaseQuery`](crate::BroadPhaseQuery) can report hits to.
pub trait Collector {
    fn collector_handle(&self) -> RphysCollector;
}

host_handle!(
    /// Keeps every body id reported.
    AllHitCollector(RphysAllHitCollector),
    free: ffi::rphys_all_hit_collector_free
);

impl AllHitCollector {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_all_hit_collector_create_default()) }
    }

    pub fn len(&self) -> usize {
        (unsafe { ffi::rphys_all_hit_collector_count_hits(self.handle) }) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The hits in the order they were reported.
    pub fn hits(&self) -> Vec<BodyId> {
        (0..self.len() as u32)
            .map(|i| BodyId::from_raw(unsafe { ffi::rphys_all_hit_collector_get_hit(self.handle, i) }))
            .collect()
    }

    pub fn reset(&mut self) {
        unsafe { ffi::rphys_all_hit_collector_reset(self.handle) };
    }
}

impl Default for AllHitCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for AllHitCollector {
    fn collector_handle(&self) -> RphysCollector {
        self.handle.into()
    }
}

host_handle!(
    /// Stops the query at the first hit.
    AnyHitCollector(RphysAnyHitCollector),
    free: ffi::rphys_any_hit_collector_free
);

impl AnyHitCollector {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_any_hit_collector_create_default()) }
    }

    /// The first body reported, if any.
    pub fn hit(&self) -> Option<BodyId> {
        unsafe { ffi::rphys_any_hit_collector_had_hit(self.handle) }
            .then(|| BodyId::from_raw(unsafe { ffi::rphys_any_hit_collector_get_hit(self.handle) }))
    }

    pub fn reset(&mut self) {
        unsafe { ffi::rphys_any_hit_collector_reset(self.handle) };
    }
}

impl Default for AnyHitCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for AnyHitCollector {
    fn collector_handle(&self) -> RphysCollector {
        self.handle.into()
    }
}

host_handle!(
    /// Forwards every hit to `addHit(int)` on a host object.
    CustomCollector(RphysCustomCollector),
    free: ffi::rphys_custom_collector_free
);

impl CustomCollector {
    /// # Safety
    ///
    /// The functions in `table` must stay callable from any thread until the
    /// collector is dropped, and `host_object` must be a live object of that
    /// runtime.
    pub unsafe fn new(table: &RphysHostRuntime, host_object: u64) -> Result<Self> {
        let handle = unsafe { ffi::collector::create_custom_collector(table, host_object)? };
        Ok(Self::from_handle(handle))
    }

    pub fn reset(&mut self) {
        unsafe { ffi::rphys_custom_collector_reset(self.handle) };
    }

    pub fn force_early_out(&mut self) {
        unsafe { ffi::rphys_custom_collector_force_early_out(self.handle) };
    }

    pub fn should_early_out(&self) -> bool {
        unsafe { ffi::rphys_custom_collector_should_early_out(self.handle) }
    }

    /// Whether a callback left a host exception pending.
    pub fn had_exception(&self) -> bool {
        unsafe { ffi::rphys_custom_collector_had_exception(self.handle) }
    }
}

impl Collector for CustomCollector {
    fn collector_handle(&self) -> RphysCollector {
        self.handle.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collectors() {
        let all = AllHitCollector::new();
        assert!(all.is_empty());
        assert!(all.hits().is_empty());

        let any = AnyHitCollector::default();
        assert_eq!(any.hit(), None);
        assert!(any.collector_handle().is_valid());
    }
}

/// Anything a ray cast can report hits to.
pub trait CastRayCollector {
    fn cast_ray_collector_handle(&self) -> RphysCastRayCollector;
}

/// Read and free a result returned by the library.
unsafe fn take_cast_result(handle: RphysBroadPhaseCastResult) -> BroadPhaseCastResult {
    let result = unsafe {
        BroadPhaseCastResult {
            body_id: BodyId::from_raw(ffi::rphys_broad_phase_cast_result_get_body_id(handle)),
            fraction: ffi::rphys_broad_phase_cast_result_get_fraction(handle),
        }
    };
    unsafe { ffi::rphys_broad_phase_cast_result_free(handle) };
    result
}

host_handle!(
    /// Keeps every ray hit.
    AllHitCastRayCollector(RphysAllHitCastRayCollector),
    free: ffi::rphys_all_hit_cast_ray_collector_free
);

impl AllHitCastRayCollector {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_all_hit_cast_ray_collector_create_default()) }
    }

    pub fn len(&self) -> usize {
        (unsafe { ffi::rphys_all_hit_cast_ray_collector_count_hits(self.handle) }) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> Vec<BroadPhaseCastResult> {
        (0..self.len() as u32)
            .map(|i| unsafe { take_cast_result(ffi::rphys_all_hit_cast_ray_collector_get_hit(self.handle, i)) })
            .collect()
    }

    /// Order the hits from nearest to farthest.
    pub fn sort(&mut self) {
        unsafe { ffi::rphys_all_hit_cast_ray_collector_sort(self.handle) };
    }

    pub fn reset(&mut self) {
        unsafe { ffi::rphys_all_hit_cast_ray_collector_reset(self.handle) };
    }
}

impl Default for AllHitCastRayCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CastRayCollector for AllHitCastRayCollector {
    fn cast_ray_collector_handle(&self) -> RphysCastRayCollector {
        self.handle.into()
    }
}

host_handle!(
    /// Stops the ray cast at the first hit, which need not be the nearest.
    AnyHitCastRayCollector(RphysAnyHitCastRayCollector),
    free: ffi::rphys_any_hit_cast_ray_collector_free
);

impl AnyHitCastRayCollector {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_any_hit_cast_ray_collector_create_default()) }
    }

    pub fn hit(&self) -> Option<BroadPhaseCastResult> {
        let handle = unsafe { ffi::rphys_any_hit_cast_ray_collector_get_hit(self.handle) };
        handle
            .is_valid()
            .then(|| unsafe { take_cast_result(handle) })
    }

    pub fn reset(&mut self) {
        unsafe { ffi::rphys_any_hit_cast_ray_collector_reset(self.handle) };
    }
}

impl Default for AnyHitCastRayCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CastRayCollector for AnyHitCastRayCollector {
    fn cast_ray_collector_handle(&self) -> RphysCastRayCollector {
        self.handle.into()
    }
}
