//! Exported functions for broad-phase body collectors.
//!
//! Every collector kind lives behind the same native type, so any of the
//! specific handles converts into the [`RphysCollector`] taken by queries.

use std::sync::Arc;

use crate::bridge::{CallbackPeer, FfiHostRuntime, HostObject, RphysHostRuntime};
use crate::engine::{AllHitCollector, AnyHitCollector, BodyCollector, BodyId, CustomBodyCollector};
use crate::ffi::handles::*;

/// A collector of any kind, as seen through a handle.
pub enum HostCollector {
    AllHit(AllHitCollector),
    AnyHit(AnyHitCollector),
    Custom(CustomBodyCollector),
}

impl HostCollector {
    fn inner(&self) -> &dyn BodyCollector {
        match self {
            HostCollector::AllHit(c) => c,
            HostCollector::AnyHit(c) => c,
            HostCollector::Custom(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BodyCollector {
        match self {
            HostCollector::AllHit(c) => c,
            HostCollector::AnyHit(c) => c,
            HostCollector::Custom(c) => c,
        }
    }
}

impl BodyCollector for HostCollector {
    fn add_hit(&mut self, body: BodyId) {
        self.inner_mut().add_hit(body)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn should_early_out(&self) -> bool {
        self.inner().should_early_out()
    }

    fn force_early_out(&mut self) {
        self.inner_mut().force_early_out()
    }
}

fn all_hit<'a>(collector: RphysAllHitCollector) -> &'a mut AllHitCollector {
    match unsafe { collector.get_mut() } {
        HostCollector::AllHit(c) => c,
        _ => panic!("{:?} is not an all-hit collector", collector),
    }
}

fn any_hit<'a>(collector: RphysAnyHitCollector) -> &'a mut AnyHitCollector {
    match unsafe { collector.get_mut() } {
        HostCollector::AnyHit(c) => c,
        _ => panic!("{:?} is not an any-hit collector", collector),
    }
}

fn custom<'a>(collector: RphysCustomCollector) -> &'a mut CustomBodyCollector {
    match unsafe { collector.get_mut() } {
        HostCollector::Custom(c) => c,
        _ => panic!("{:?} is not a custom collector", collector),
    }
}

// ============================================================================
// All hits
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_all_hit_collector_create_default() -> RphysAllHitCollector {
    RphysAllHitCollector::new_owned(HostCollector::AllHit(AllHitCollector::new()))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_collector_free(collector: RphysAllHitCollector) {
    unsafe { collector.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_collector_count_hits(collector: RphysAllHitCollector) -> u32 {
    all_hit(collector).hits().len() as u32
}

/// The body id of hit `index`, in collection order.
#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_collector_get_hit(collector: RphysAllHitCollector, index: u32) -> u32 {
    all_hit(collector).hits()[index as usize].raw()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_all_hit_collector_reset(collector: RphysAllHitCollector) {
    all_hit(collector).reset();
}

// ============================================================================
// Any hit
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_any_hit_collector_create_default() -> RphysAnyHitCollector {
    RphysAnyHitCollector::new_owned(HostCollector::AnyHit(AnyHitCollector::new()))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_collector_free(collector: RphysAnyHitCollector) {
    unsafe { collector.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_collector_had_hit(collector: RphysAnyHitCollector) -> bool {
    any_hit(collector).had_hit()
}

/// The body found, or the invalid body id.
#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_collector_get_hit(collector: RphysAnyHitCollector) -> u32 {
    any_hit(collector).hit().unwrap_or_default().raw()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_any_hit_collector_reset(collector: RphysAnyHitCollector) {
    any_hit(collector).reset();
}

// ============================================================================
// Custom
// ============================================================================

/// Resolve `addHit(int)` on `host_object` and wrap it in a collector handle.
///
/// No host reference is kept when this fails.
///
/// # Safety
///
/// `table` must hold functions that stay callable from any thread until the
/// collector is freed.
pub unsafe fn create_custom_collector(
    table: &RphysHostRuntime,
    host_object: u64,
) -> crate::Result<RphysCustomCollector> {
    let runtime = Arc::new(unsafe { FfiHostRuntime::new(*table) });
    let peer = CallbackPeer::new(
        runtime,
        HostObject(host_object),
        CustomBodyCollector::METHOD_NAME,
        CustomBodyCollector::METHOD_SIGNATURE,
    )?;
    Ok(RphysCustomCollector::new_owned(HostCollector::Custom(CustomBodyCollector::new(peer))))
}

/// A collector calling `addHit(int)` on `host_object` for every hit.
///
/// Returns null when the method cannot be resolved or the thread cannot be
/// attached.
///
/// # Safety
///
/// `table` must point to a function table that stays callable from any
/// thread until the collector is freed.
#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_create(
    table: *const RphysHostRuntime,
    host_object: u64,
) -> RphysCustomCollector {
    assert!(!table.is_null(), "null RphysHostRuntime");
    match unsafe { create_custom_collector(&*table, host_object) } {
        Ok(collector) => collector,
        Err(err) => {
            log::warn!("cannot create custom collector: {}", err);
            RphysCustomCollector::invalid()
        }
    }
}

/// Free the collector, releasing its host reference.
#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_free(collector: RphysCustomCollector) {
    unsafe { collector.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_reset(collector: RphysCustomCollector) {
    custom(collector).reset();
}

#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_force_early_out(collector: RphysCustomCollector) {
    custom(collector).force_early_out();
}

#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_should_early_out(collector: RphysCustomCollector) -> bool {
    custom(collector).should_early_out()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_custom_collector_had_exception(collector: RphysCustomCollector) -> bool {
    custom(collector).had_exception()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_hit_through_base_handle() {
        let collector = rphys_all_hit_collector_create_default();
        let base: RphysCollector = collector.into();
        let inner = unsafe { base.get_mut() };
        inner.add_hit(BodyId::new(3, 0));
        inner.add_hit(BodyId::new(5, 1));

        assert_eq!(unsafe { rphys_all_hit_collector_count_hits(collector) }, 2);
        assert_eq!(unsafe { rphys_all_hit_collector_get_hit(collector, 1) }, BodyId::new(5, 1).raw());
        unsafe { rphys_all_hit_collector_reset(collector) };
        assert_eq!(unsafe { rphys_all_hit_collector_count_hits(collector) }, 0);
        unsafe { rphys_all_hit_collector_free(collector) };
    }

    #[test]
    fn test_any_hit_without_hit() {
        let collector = rphys_any_hit_collector_create_default();
        assert!(!unsafe { rphys_any_hit_collector_had_hit(collector) });
        assert_eq!(unsafe { rphys_any_hit_collector_get_hit(collector) }, BodyId::INVALID.raw());
        unsafe { rphys_any_hit_collector_free(collector) };
    }

    #[test]
    #[should_panic(expected = "is not an any-hit collector")]
    fn test_wrong_collector_kind_is_fatal() {
        let collector = rphys_all_hit_collector_create_default();
        any_hit(RphysAnyHitCollector::from_raw(collector.raw()));
    }
}
