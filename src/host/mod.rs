//! Safe wrappers over the exported interface.
//!
//! A wrapper holds a handle and whether it owns it. Owned handles are
//! freed exactly once, on drop; views borrowed from another object are never
//! freed. Wrappers are move-only: copying a reference is explicit
//! (`try_clone` on the `Ref` wrappers).

/// Defines a wrapper type over one handle type.
///
/// `free` is called on drop for owned, non-null handles. With `sync`, the
/// wrapper is declared `Send + Sync`.
macro_rules! host_handle {
    ($(#[$meta:meta])* $name:ident($handle:ty), free: $free:path $(, $sync:ident)?) => {
        $(#[$meta])*
        pub struct $name {
            handle: $handle,
            owned: bool,
        }

        impl $name {
            /// Take ownership of `handle`.
            ///
            /// # Safety
            ///
            /// The handle must be valid and not already owned by another
            /// wrapper.
            pub(crate) unsafe fn from_handle(handle: $handle) -> Self {
                Self { handle, owned: true }
            }

            /// Wrap `handle` without taking ownership.
            #[allow(dead_code)]
            pub(crate) fn view(handle: $handle) -> Self {
                Self { handle, owned: false }
            }

            /// Get the underlying handle.
            pub fn handle(&self) -> $handle {
                self.handle
            }

            /// Whether dropping this wrapper frees the handle.
            pub fn is_owned(&self) -> bool {
                self.owned
            }

            /// Give up the handle without freeing it.
            pub fn into_handle(self) -> $handle {
                let handle = self.handle;
                std::mem::forget(self);
                handle
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                if self.owned && self.handle.is_valid() {
                    unsafe { $free(self.handle) };
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("handle", &self.handle)
                    .field("owned", &self.owned)
                    .finish()
            }
        }

        host_handle!(@sync $name $(, $sync)?);
    };
    (@sync $name:ident) => {};
    (@sync $name:ident, sync) => {
        // The native object is Send + Sync
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}
    };
}

mod body_settings;
mod collector;
mod constraint;
mod scene;
mod shape;
mod stream;
mod system;

pub use body_settings::BodyCreationSettings;
pub use collector::{
    AllHitCastRayCollector, AllHitCollector, AnyHitCastRayCollector, AnyHitCollector, CastRayCollector, Collector,
    CustomCollector,
};
pub use constraint::{ConstraintRef, ConstraintSettingsRef};
pub use scene::{PhysicsSceneRef, PhysicsSceneResult};
pub use shape::{ShapeRef, ShapeRefC, ShapeResult, ShapeSettingsRef, ShapeSettingsRefC};
pub use stream::{StreamIn, StreamOut};
pub use system::{
    Body, BodyInterface, BodyLockRead, BodyLockWrite, BroadPhaseQuery, NarrowPhaseQuery, PhysicsSystem,
};

use std::ffi::c_char;

/// Take a string returned by the library, freeing it.
///
/// # Safety
///
/// `ptr` must be null or a string returned by this library, not yet freed.
pub(crate) unsafe fn take_string(ptr: *mut c_char) -> String {
    let s = crate::ffi::buffer::read_c_string(ptr);
    crate::ffi::rphys_free_string(ptr);
    s
}
