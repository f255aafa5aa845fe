//! Handle types for native objects crossing the C boundary.
//!
//! Each handle type is a newtype wrapper around the u64 address of one
//! native type. A handle either owns its object (created by
//! [`new_owned`](RphysStreamOut::new_owned), destroyed by `free`) or is a
//! view into an object owned elsewhere.

use crate::engine::{
    Body, BodyCreationSettings, BodyInterface, BodyLockInterface, BodyLockRead, BodyLockWrite,
    BroadPhaseCastResult, BroadPhaseQuery, Constraint, ConstraintSettings, NarrowPhaseQuery,
    PhysicsScene, PhysicsSceneResult, PhysicsSystem, Ref, RefConst, RefTarget, Shape, ShapeResult,
    ShapeSettings, StreamIn, StreamOut,
};
use crate::engine::shape::SubShape;
use crate::ffi::collector::HostCollector;
use crate::ffi::ray::HostCastRayCollector;

/// Macro to define a handle type.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident => $target:ty) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            _h: u64,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self { _h: 0 }
            }

            /// Check if this handle is valid (non-zero).
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self._h != 0
            }

            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self { _h: raw }
            }

            #[inline]
            pub const fn raw(&self) -> u64 {
                self._h
            }

            /// A non-owning handle to an object owned elsewhere.
            #[inline]
            pub fn from_ptr(ptr: *const $target) -> Self {
                Self { _h: ptr as u64 }
            }

            /// Move `value` to the heap and return a handle owning it.
            pub fn new_owned(value: $target) -> Self {
                let ptr = Box::into_raw(Box::new(value));
                crate::trace::record_new::<$target>(ptr as u64);
                Self { _h: ptr as u64 }
            }

            /// # Safety
            ///
            /// The handle must designate a live object of this type.
            #[inline]
            pub unsafe fn get<'a>(self) -> &'a $target {
                assert!(self.is_valid(), concat!("null ", stringify!($name)));
                crate::trace::check_type::<$target>(self._h);
                &*(self._h as *const $target)
            }

            /// # Safety
            ///
            /// As [`get`](Self::get), and no other reference to the object
            /// may be in use.
            #[inline]
            pub unsafe fn get_mut<'a>(self) -> &'a mut $target {
                assert!(self.is_valid(), concat!("null ", stringify!($name)));
                crate::trace::check_type::<$target>(self._h);
                &mut *(self._h as *mut $target)
            }

            /// Destroy an object created by `new_owned`. A null handle is
            /// ignored.
            ///
            /// # Safety
            ///
            /// The handle must own a live object and must not be used again.
            pub unsafe fn free(self) {
                if !self.is_valid() {
                    return;
                }
                crate::trace::record_delete::<$target>(self._h);
                drop(Box::from_raw(self._h as *mut $target));
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

define_handle!(RphysBodyCreationSettings => BodyCreationSettings);

define_handle!(
    /// Shape settings object, not counted.
    RphysShapeSettings => RefTarget<ShapeSettings>
);
define_handle!(RphysShapeSettingsRef => Ref<ShapeSettings>);
define_handle!(RphysShapeSettingsRefC => RefConst<ShapeSettings>);

define_handle!(
    /// Shape object, not counted.
    RphysShape => RefTarget<Shape>
);
define_handle!(RphysShapeRef => Ref<Shape>);
define_handle!(RphysShapeRefC => RefConst<Shape>);
define_handle!(
    /// View of a compound child; dangles once the child is removed.
    RphysSubShape => SubShape
);
define_handle!(RphysShapeResult => ShapeResult);

define_handle!(RphysStreamOut => StreamOut);
define_handle!(RphysStreamIn => StreamIn);

define_handle!(RphysPhysicsSystem => PhysicsSystem);
define_handle!(RphysBodyInterface => BodyInterface);
define_handle!(RphysBodyLockInterface => BodyLockInterface);
define_handle!(RphysBroadPhaseQuery => BroadPhaseQuery);
define_handle!(RphysNarrowPhaseQuery => NarrowPhaseQuery);
define_handle!(
    /// Body view, valid while the lock it came from is held.
    RphysBody => Body
);
define_handle!(RphysBodyLockRead => BodyLockRead);
define_handle!(RphysBodyLockWrite => BodyLockWrite);

define_handle!(
    /// Any collector, as accepted by the broad-phase queries.
    RphysCollector => HostCollector
);
define_handle!(RphysAllHitCollector => HostCollector);
define_handle!(RphysAnyHitCollector => HostCollector);
define_handle!(RphysCustomCollector => HostCollector);

define_handle!(
    /// Any ray-cast collector, as accepted by the ray casts.
    RphysCastRayCollector => HostCastRayCollector
);
define_handle!(RphysAllHitCastRayCollector => HostCastRayCollector);
define_handle!(RphysAnyHitCastRayCollector => HostCastRayCollector);
define_handle!(RphysBroadPhaseCastResult => BroadPhaseCastResult);

define_handle!(RphysConstraintSettings => RefTarget<ConstraintSettings>);
define_handle!(RphysConstraintSettingsRef => Ref<ConstraintSettings>);
define_handle!(RphysConstraintSettingsRefC => RefConst<ConstraintSettings>);
define_handle!(RphysConstraint => RefTarget<Constraint>);
define_handle!(RphysConstraintRef => Ref<Constraint>);

define_handle!(RphysPhysicsScene => RefTarget<PhysicsScene>);
define_handle!(RphysPhysicsSceneRef => Ref<PhysicsScene>);
define_handle!(RphysPhysicsSceneResult => PhysicsSceneResult);

macro_rules! upcast_collector {
    ($base:ident: $($name:ident),+) => {
        $(
            impl From<$name> for $base {
                fn from(handle: $name) -> Self {
                    $base::from_raw(handle.raw())
                }
            }
        )+
    };
}

upcast_collector!(RphysCollector: RphysAllHitCollector, RphysAnyHitCollector, RphysCustomCollector);
upcast_collector!(RphysCastRayCollector: RphysAllHitCastRayCollector, RphysAnyHitCastRayCollector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace;

    #[test]
    fn test_invalid_handle() {
        let handle = RphysStreamOut::default();
        assert!(!handle.is_valid());
        assert_eq!(handle.raw(), 0);
        // Freeing null is a no-op.
        unsafe { handle.free() };
    }

    #[test]
    fn test_owned_handle_balances() {
        let before = trace::live_allocations_of::<StreamOut>();
        let handle = RphysStreamOut::new_owned(StreamOut::new());
        assert!(handle.is_valid());
        assert_eq!(trace::live_allocations_of::<StreamOut>(), before + 1);
        assert!(unsafe { handle.get() }.is_empty());
        unsafe { handle.free() };
        assert_eq!(trace::live_allocations_of::<StreamOut>(), before);
    }

    #[test]
    #[should_panic(expected = "null RphysShapeResult")]
    fn test_null_dereference_is_fatal() {
        let _ = unsafe { RphysShapeResult::invalid().get() };
    }
}
