//! Allocation tracing and live-object bookkeeping.
//!
//! Every object handed across the boundary is announced here when it is
//! allocated and again when it is destroyed. Three things hang off those
//! announcements:
//!
//! - optional `log::trace!` output, toggled with [`set_trace_allocations`];
//! - per-thread live counters, used to prove that create/free sequences
//!   balance ([`live_allocations`], [`live_allocations_of`]);
//! - with the `checked-handles` feature, a global registry of live
//!   addresses tagged with their type, which turns double frees and type
//!   confusion into immediate panics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACE_ALLOCATIONS: AtomicBool = AtomicBool::new(false);

thread_local! {
    static LIVE: RefCell<HashMap<&'static str, i64>> = RefCell::new(HashMap::new());
}

/// Enable or disable allocation tracing through the `log` facade.
pub fn set_trace_allocations(setting: bool) {
    TRACE_ALLOCATIONS.store(setting, Ordering::Relaxed);
}

/// Whether allocation tracing is enabled.
pub fn trace_allocations() -> bool {
    TRACE_ALLOCATIONS.load(Ordering::Relaxed)
}

/// Net number of objects allocated minus destroyed on the current thread.
///
/// Objects allocated on one thread and destroyed on another skew the
/// per-thread figures; balance checks belong on a single thread.
pub fn live_allocations() -> i64 {
    LIVE.with(|live| live.borrow().values().sum())
}

/// Net number of live objects of type `T` on the current thread.
pub fn live_allocations_of<T>() -> i64 {
    let name = std::any::type_name::<T>();
    LIVE.with(|live| live.borrow().get(name).copied().unwrap_or(0))
}

pub(crate) fn record_new<T>(addr: u64) {
    let name = std::any::type_name::<T>();
    LIVE.with(|live| *live.borrow_mut().entry(name).or_insert(0) += 1);
    #[cfg(feature = "checked-handles")]
    registry::insert(addr, name);
    if trace_allocations() {
        log::trace!("new {} at {:#x}", name, addr);
    }
}

pub(crate) fn record_delete<T>(addr: u64) {
    let name = std::any::type_name::<T>();
    #[cfg(feature = "checked-handles")]
    registry::remove(addr, name);
    LIVE.with(|live| *live.borrow_mut().entry(name).or_insert(0) -= 1);
    if trace_allocations() {
        log::trace!("delete {} at {:#x}", name, addr);
    }
}

/// Validate that `addr`, if it is a tracked allocation, holds a `T`.
///
/// Untracked addresses pass: they are non-owning views into engine state.
#[inline]
pub(crate) fn check_type<T>(addr: u64) {
    #[cfg(feature = "checked-handles")]
    registry::check(addr, std::any::type_name::<T>());
    #[cfg(not(feature = "checked-handles"))]
    let _ = addr;
}

#[cfg(feature = "checked-handles")]
mod registry {
    use std::collections::BTreeMap;

    use parking_lot::Mutex;

    /// Live tracked addresses and the type stored at each.
    static LIVE_HANDLES: Mutex<BTreeMap<u64, &'static str>> = parking_lot::const_mutex(BTreeMap::new());

    pub(super) fn insert(addr: u64, name: &'static str) {
        LIVE_HANDLES.lock().insert(addr, name);
    }

    pub(super) fn remove(addr: u64, name: &'static str) {
        let previous = LIVE_HANDLES.lock().remove(&addr);
        match previous {
            Some(tag) if tag == name => {}
            Some(tag) => panic!("handle {:#x} freed as {} but holds {}", addr, name, tag),
            None => panic!("handle {:#x} freed as {} is not live (double free?)", addr, name),
        }
    }

    pub(super) fn check(addr: u64, name: &'static str) {
        if let Some(tag) = LIVE_HANDLES.lock().get(&addr) {
            assert!(
                *tag == name,
                "handle {:#x} used as {} but holds {}",
                addr,
                name,
                tag
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracked;

    #[test]
    fn test_counters_balance() {
        let before = live_allocations_of::<Tracked>();
        record_new::<Tracked>(0x1000);
        assert_eq!(live_allocations_of::<Tracked>(), before + 1);
        record_delete::<Tracked>(0x1000);
        assert_eq!(live_allocations_of::<Tracked>(), before);
    }

    #[test]
    fn test_trace_toggle() {
        set_trace_allocations(true);
        assert!(trace_allocations());
        set_trace_allocations(false);
        assert!(!trace_allocations());
    }
}
