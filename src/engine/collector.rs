//! Collectors receiving the bodies found by broad-phase queries, and the
//! ray-cast collectors receiving bodies together with the fraction along the
//! ray where they were hit.

use crate::bridge::CallbackPeer;
use crate::engine::body::BodyId;

/// Receives hits from a broad-phase query.
///
/// Hits arrive in the order the query produces them. A query stops as soon
/// as [`should_early_out`](BodyCollector::should_early_out) returns true.
pub trait BodyCollector {
    /// Record one body.
    fn add_hit(&mut self, body: BodyId);

    /// Forget earlier hits and the early-out request.
    fn reset(&mut self);

    /// Whether the running query should stop.
    fn should_early_out(&self) -> bool;

    /// Ask the running query to stop.
    fn force_early_out(&mut self);
}

/// Collects every hit.
#[derive(Debug, Default)]
pub struct AllHitCollector {
    hits: Vec<BodyId>,
    early_out: bool,
}

impl AllHitCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> &[BodyId] {
        &self.hits
    }

    pub fn had_hit(&self) -> bool {
        !self.hits.is_empty()
    }
}

impl BodyCollector for AllHitCollector {
    fn add_hit(&mut self, body: BodyId) {
        self.hits.push(body);
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.early_out = false;
    }

    fn should_early_out(&self) -> bool {
        self.early_out
    }

    fn force_early_out(&mut self) {
        self.early_out = true;
    }
}

/// Stops at the first hit.
#[derive(Debug, Default)]
pub struct AnyHitCollector {
    hit: Option<BodyId>,
    early_out: bool,
}

impl AnyHitCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) -> Option<BodyId> {
        self.hit
    }

    pub fn had_hit(&self) -> bool {
        self.hit.is_some()
    }
}

impl BodyCollector for AnyHitCollector {
    fn add_hit(&mut self, body: BodyId) {
        self.hit = Some(body);
        self.force_early_out();
    }

    fn reset(&mut self) {
        self.hit = None;
        self.early_out = false;
    }

    fn should_early_out(&self) -> bool {
        self.early_out
    }

    fn force_early_out(&mut self) {
        self.early_out = true;
    }
}

/// Forwards every hit to a host object's `addHit(int)` method.
///
/// A host exception raised by the callback stops the query; the exception
/// itself stays pending in the host runtime.
pub struct CustomBodyCollector {
    peer: CallbackPeer,
    early_out: bool,
    had_exception: bool,
}

impl CustomBodyCollector {
    /// Host method invoked for each hit.
    pub const METHOD_NAME: &'static std::ffi::CStr = c"addHit";
    /// Signature of [`METHOD_NAME`](Self::METHOD_NAME) in host notation.
    pub const METHOD_SIGNATURE: &'static std::ffi::CStr = c"(I)V";

    pub fn new(peer: CallbackPeer) -> Self {
        Self {
            peer,
            early_out: false,
            had_exception: false,
        }
    }

    /// Whether a callback raised a host exception since the last reset.
    pub fn had_exception(&self) -> bool {
        self.had_exception
    }
}

impl BodyCollector for CustomBodyCollector {
    fn add_hit(&mut self, body: BodyId) {
        if let Err(err) = self.peer.call_int(body.raw() as i32) {
            log::warn!("addHit({:#x}) failed: {}", body.raw(), err);
            self.had_exception = true;
            self.force_early_out();
        }
    }

    fn reset(&mut self) {
        self.early_out = false;
        self.had_exception = false;
    }

    fn should_early_out(&self) -> bool {
        self.early_out
    }

    fn force_early_out(&mut self) {
        self.early_out = true;
    }
}

/// A body hit by a ray cast.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BroadPhaseCastResult {
    pub body_id: BodyId,
    /// Hit position as a fraction of the ray direction, in `[0, 1]`.
    pub fraction: f32,
}

/// Receives hits from a ray cast.
///
/// Hits arrive in traversal order, not sorted by fraction.
pub trait CastRayCollector {
    fn add_hit(&mut self, hit: BroadPhaseCastResult);

    fn reset(&mut self);

    fn should_early_out(&self) -> bool;

    fn force_early_out(&mut self);
}

/// Collects every ray hit.
#[derive(Debug, Default)]
pub struct AllHitCastRayCollector {
    hits: Vec<BroadPhaseCastResult>,
    early_out: bool,
}

impl AllHitCastRayCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> &[BroadPhaseCastResult] {
        &self.hits
    }

    pub fn had_hit(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Order the hits from nearest to farthest.
    pub fn sort(&mut self) {
        self.hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
    }
}

impl CastRayCollector for AllHitCastRayCollector {
    fn add_hit(&mut self, hit: BroadPhaseCastResult) {
        self.hits.push(hit);
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.early_out = false;
    }

    fn should_early_out(&self) -> bool {
        self.early_out
    }

    fn force_early_out(&mut self) {
        self.early_out = true;
    }
}

/// Stops at the first ray hit, which need not be the nearest.
#[derive(Debug, Default)]
pub struct AnyHitCastRayCollector {
    hit: Option<BroadPhaseCastResult>,
    early_out: bool,
}

impl AnyHitCastRayCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) -> Option<BroadPhaseCastResult> {
        self.hit
    }

    pub fn had_hit(&self) -> bool {
        self.hit.is_some()
    }
}

impl CastRayCollector for AnyHitCastRayCollector {
    fn add_hit(&mut self, hit: BroadPhaseCastResult) {
        self.hit = Some(hit);
        self.force_early_out();
    }

    fn reset(&mut self) {
        self.hit = None;
        self.early_out = false;
    }

    fn should_early_out(&self) -> bool {
        self.early_out
    }

    fn force_early_out(&mut self) {
        self.early_out = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(index: u32, fraction: f32) -> BroadPhaseCastResult {
        BroadPhaseCastResult {
            body_id: BodyId::new(index, 0),
            fraction,
        }
    }

    #[test]
    fn test_all_hit_reset() {
        let mut collector = AllHitCollector::new();
        collector.add_hit(BodyId::new(1, 0));
        collector.add_hit(BodyId::new(2, 0));
        collector.force_early_out();
        assert_eq!(collector.hits().len(), 2);
        assert!(collector.should_early_out());

        collector.reset();
        assert!(!collector.had_hit());
        assert!(!collector.should_early_out());
    }

    #[test]
    fn test_any_hit_stops_after_first() {
        let mut collector = AnyHitCollector::new();
        assert!(!collector.should_early_out());
        collector.add_hit(BodyId::new(4, 1));
        assert!(collector.should_early_out());
        assert_eq!(collector.hit(), Some(BodyId::new(4, 1)));
    }

    #[test]
    fn test_all_hit_cast_ray_sort() {
        let mut collector = AllHitCastRayCollector::new();
        collector.add_hit(hit(1, 0.75));
        collector.add_hit(hit(2, 0.25));
        collector.add_hit(hit(3, 0.5));
        collector.sort();
        let order: Vec<u32> = collector.hits().iter().map(|h| h.body_id.index()).collect();
        assert_eq!(order, vec![2, 3, 1]);

        collector.reset();
        assert!(!collector.had_hit());
    }

    #[test]
    fn test_any_hit_cast_ray_keeps_first() {
        let mut collector = AnyHitCastRayCollector::new();
        collector.add_hit(hit(7, 0.9));
        assert!(collector.should_early_out());
        assert_eq!(collector.hit(), Some(hit(7, 0.9)));
        collector.reset();
        assert_eq!(collector.hit(), None);
        assert!(!collector.should_early_out());
    }
}
