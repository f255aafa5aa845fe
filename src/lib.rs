//! Handle-based bindings for the rapier rigid-body physics engine.
//!
//! The library exposes physics objects (body creation settings, shapes and
//! their settings, a physics system with its body and lock interfaces,
//! broad-phase queries, collectors, constraints and scenes) to a managed host
//! through a flat `extern "C"` interface in [`ffi`]. Every native object
//! crosses the boundary as a 64-bit handle; reference-counted objects are
//! held through `Ref` and `RefC` handles.
//!
//! Rust callers use the safe wrappers re-exported at the crate root, which
//! free what they own on drop.
//!
//! # Example
//!
//! ```no_run
//! use glam::{DVec3, Quat, Vec3};
//! use rphys::{Activation, AllHitCollector, BodyCreationSettings, MotionType, PhysicsSystem, ShapeRef};
//!
//! fn main() -> rphys::Result<()> {
//!     let system = PhysicsSystem::new(1024);
//!     let bodies = system.body_interface();
//!
//!     // A static floor and a falling ball
//!     let floor = ShapeRef::cuboid(Vec3::new(50.0, 0.5, 50.0), 0.05)?.to_const();
//!     let settings = BodyCreationSettings::from_shape(&floor, DVec3::ZERO, Quat::IDENTITY, MotionType::Static, 0);
//!     bodies.create_and_add_body(&settings, Activation::DontActivate);
//!
//!     let ball = ShapeRef::sphere(0.5)?.to_const();
//!     let settings =
//!         BodyCreationSettings::from_shape(&ball, DVec3::new(0.0, 5.0, 0.0), Quat::IDENTITY, MotionType::Dynamic, 1);
//!     let id = bodies.create_and_add_body(&settings, Activation::Activate);
//!
//!     for _ in 0..120 {
//!         system.update(1.0 / 60.0, 1);
//!     }
//!     println!("ball at {:?}", bodies.position(id));
//!
//!     // Everything near the origin
//!     let mut hits = AllHitCollector::new();
//!     system
//!         .broad_phase_query()
//!         .collide_sphere(Vec3::ZERO, 2.0, &mut hits);
//!     println!("{} bodies near the origin", hits.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Callbacks
//!
//! A [`CustomCollector`] forwards each hit to a method on a host object. The
//! host runtime is reached through the function table in
//! [`bridge::RphysHostRuntime`]; threads the runtime has not seen are
//! attached for the duration of each call.

pub mod bridge;
pub mod engine;
pub mod error;
pub mod ffi;
mod host;
pub mod trace;
pub mod types;

// Re-export main types at the crate root
pub use engine::{BodyId, BroadPhaseCastResult, PhysicsSettings};
pub use error::{Error, Result};
pub use host::{
    AllHitCastRayCollector, AllHitCollector, AnyHitCastRayCollector, AnyHitCollector, Body, BodyCreationSettings,
    BodyInterface, BodyLockRead, BodyLockWrite, BroadPhaseQuery, CastRayCollector, Collector, ConstraintRef,
    ConstraintSettingsRef, CustomCollector, NarrowPhaseQuery, PhysicsSceneRef, PhysicsSceneResult, PhysicsSystem,
    ShapeRef, ShapeRefC, ShapeResult, ShapeSettingsRef, ShapeSettingsRefC, StreamIn, StreamOut,
};
pub use types::{
    Activation, ConstraintSpace, ConstraintSubType, ConstraintType, MotionQuality, MotionType,
    OverrideMassProperties, ShapeSubType, ShapeType, StreamType,
};

/// Version of the bindings.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// API version constants.
pub mod version {
    /// API major version.
    pub const MAJOR: i32 = 0;
    /// API minor version.
    pub const MINOR: i32 = 1;
    /// API patch version.
    pub const PATCH: i32 = 0;
}

/// "Debug" or "Release", after the build profile.
pub fn build_type() -> &'static str {
    if cfg!(debug_assertions) {
        "Debug"
    } else {
        "Release"
    }
}

/// Get the version string as reported across the C interface.
pub fn version_string() -> String {
    unsafe { host::take_string(ffi::rphys_version_string()) }
}

/// Whether positions are simulated in double precision.
pub fn is_double_precision() -> bool {
    ffi::rphys_is_double_precision()
}

/// Whether whole-object streams are supported.
pub fn supports_object_stream() -> bool {
    ffi::rphys_supports_object_stream()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        assert_eq!(version_string(), VERSION);
        assert_eq!(
            VERSION,
            format!("{}.{}.{}", version::MAJOR, version::MINOR, version::PATCH)
        );
    }

    #[test]
    fn test_build_type() {
        let build = unsafe { host::take_string(ffi::rphys_build_type()) };
        assert_eq!(build, build_type());
        assert!(build == "Debug" || build == "Release");
    }

    #[test]
    fn test_capabilities() {
        assert!(!is_double_precision());
        assert!(supports_object_stream());
    }
}
