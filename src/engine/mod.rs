//! The native object model exposed through the C interface.
//!
//! Reference-counted objects ([`shape::Shape`], [`shape::ShapeSettings`],
//! [`constraint::ConstraintSettings`], [`constraint::Constraint`],
//! [`scene::PhysicsScene`]) live in a [`refcount::RefTarget`]; everything
//! else is owned by value.

pub mod body;
pub mod body_settings;
pub mod collector;
pub mod constraint;
pub(crate) mod math;
pub mod refcount;
pub mod result;
pub mod scene;
pub mod shape;
pub mod stream;
pub mod system;

pub use body::{Body, BodyId};
pub use body_settings::BodyCreationSettings;
pub use collector::{
    AllHitCastRayCollector, AllHitCollector, AnyHitCastRayCollector, AnyHitCollector, BodyCollector,
    BroadPhaseCastResult, CastRayCollector, CustomBodyCollector,
};
pub use constraint::{Constraint, ConstraintKind, ConstraintParams, ConstraintSettings};
pub use refcount::{Ref, RefConst, RefTarget};
pub use result::{EngineResult, PhysicsSceneResult, ShapeResult};
pub use scene::PhysicsScene;
pub use shape::{Shape, ShapeSettings};
pub use stream::{StreamIn, StreamOut};
pub use system::{
    BodyInterface, BodyLockInterface, BodyLockRead, BodyLockWrite, BroadPhaseQuery, NarrowPhaseQuery,
    PhysicsSettings, PhysicsSystem,
};
