//! Intrusive reference counting.
//!
//! A [`RefTarget`] is a heap allocation carrying an atomic count next to the
//! object it guards. The count starts at zero: a freshly created object is
//! owned by nobody until the first [`Ref`] or [`RefConst`] is taken. Every
//! wrapper increments on creation and decrements on drop; the release that
//! brings the count to zero destroys the allocation, wherever it happens
//! (a host `free`, a physics system dropping a constraint, a body dropping
//! its shape).
//!
//! `Ref` and `RefConst` share representation and release protocol. They
//! differ only in what they promise: a `Ref` may be used to mutate the
//! object, a `RefConst` may not, and a `RefConst` never turns back into a
//! `Ref`.

use std::fmt;
use std::mem;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicU32, Ordering};

use crate::trace;

/// Added to the count of objects that live inside another allocation so
/// that releases never reach zero.
pub const EMBEDDED: u32 = 0x0ebe_dded;

/// An object with an intrusive atomic reference count.
pub struct RefTarget<T> {
    count: AtomicU32,
    value: T,
}

impl<T> RefTarget<T> {
    /// Allocate a new target with a reference count of zero.
    ///
    /// The allocation is leaked until the count drops from one to zero, or
    /// forever if no reference is ever taken.
    pub fn new(value: T) -> NonNull<RefTarget<T>> {
        let ptr = NonNull::from(Box::leak(Box::new(RefTarget {
            count: AtomicU32::new(0),
            value,
        })));
        trace::record_new::<RefTarget<T>>(ptr.as_ptr() as u64);
        ptr
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mark the object as embedded in another allocation: it is never freed
    /// by a release.
    pub fn set_embedded(&self) {
        let previous = self.count.fetch_add(EMBEDDED, Ordering::Relaxed);
        assert!(previous < EMBEDDED, "object already embedded");
    }

    /// The guarded object.
    pub fn get(&self) -> &T {
        &self.value
    }

    fn add_ref(&self) {
        let previous = self.count.fetch_add(1, Ordering::Relaxed);
        assert!(previous < u32::MAX, "reference count overflow");
    }

    /// Drop one reference, destroying the target when it was the last.
    ///
    /// # Safety
    ///
    /// `this` must point to a live target whose count was raised by the
    /// caller.
    unsafe fn release(this: NonNull<RefTarget<T>>) {
        let previous = this.as_ref().count.fetch_sub(1, Ordering::Release);
        assert!(previous > 0, "reference count underflow");
        if previous == 1 {
            fence(Ordering::Acquire);
            trace::record_delete::<RefTarget<T>>(this.as_ptr() as u64);
            drop(Box::from_raw(this.as_ptr()));
        }
    }
}

impl<T> Deref for RefTarget<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Generates one owning wrapper kind over [`RefTarget`].
macro_rules! ref_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<T> {
            ptr: NonNull<RefTarget<T>>,
        }

        impl<T> $name<T> {
            /// Allocate a new object and take the first reference to it.
            pub fn new(value: T) -> Self {
                // SAFETY: the target was just allocated and is live.
                unsafe { Self::from_target(RefTarget::new(value)) }
            }

            /// Take a new reference to an existing target.
            ///
            /// # Safety
            ///
            /// `ptr` must point to a live [`RefTarget<T>`].
            pub unsafe fn from_target(ptr: NonNull<RefTarget<T>>) -> Self {
                ptr.as_ref().add_ref();
                Self { ptr }
            }

            /// Take a new reference to the target behind `target`.
            pub fn from_ref(target: &RefTarget<T>) -> Self {
                target.add_ref();
                Self {
                    ptr: NonNull::from(target),
                }
            }

            /// The target, without touching the count.
            pub fn target(&self) -> &RefTarget<T> {
                // SAFETY: this wrapper holds a reference, so the target is live.
                unsafe { self.ptr.as_ref() }
            }

            /// Raw address of the target.
            pub fn as_ptr(&self) -> *const RefTarget<T> {
                self.ptr.as_ptr()
            }

            /// Current reference count of the target.
            pub fn ref_count(&self) -> u32 {
                self.target().ref_count()
            }

            /// Whether two wrappers designate the same target.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                self.ptr == other.ptr
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self::from_ref(self.target())
            }
        }

        impl<T> Drop for $name<T> {
            fn drop(&mut self) {
                // SAFETY: this wrapper raised the count when it was created.
                unsafe { RefTarget::release(self.ptr) }
            }
        }

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                self.target().get()
            }
        }

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.ptr_eq(other)
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("ptr", &self.ptr)
                    .field("count", &self.ref_count())
                    .finish()
            }
        }

        // SAFETY: the count is atomic; sharing follows the guarded type.
        unsafe impl<T: Send + Sync> Send for $name<T> {}
        unsafe impl<T: Send + Sync> Sync for $name<T> {}
    };
}

ref_wrapper!(
    /// Owning, mutable reference to a [`RefTarget`].
    Ref
);

ref_wrapper!(
    /// Owning, read-only reference to a [`RefTarget`].
    RefConst
);

impl<T> Ref<T> {
    /// A read-only reference to the same target.
    pub fn to_const(&self) -> RefConst<T> {
        RefConst::from_ref(self.target())
    }

    /// Give up this reference without destroying the target. A target held
    /// by nobody else is left at count zero, owned by whoever takes the next
    /// reference.
    pub(crate) fn into_unreferenced(self) -> NonNull<RefTarget<T>> {
        let ptr = self.ptr;
        mem::forget(self);
        // SAFETY: the forgotten wrapper kept the target alive until now.
        let previous = unsafe { ptr.as_ref() }.count.fetch_sub(1, Ordering::Release);
        assert!(previous > 0, "reference count underflow");
        ptr
    }
}

impl<T> RefConst<T> {
    /// A mutable reference to the same target, for the few places where a
    /// const object is handed back through a mutable result type.
    pub(crate) fn cast_mut(&self) -> Ref<T> {
        Ref::from_ref(self.target())
    }
}

impl<T> From<Ref<T>> for RefConst<T> {
    fn from(r: Ref<T>) -> Self {
        r.to_const()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_target_starts_at_zero() {
        let ptr = RefTarget::new(5_i32);
        let target = unsafe { ptr.as_ref() };
        assert_eq!(target.ref_count(), 0);
        let r = Ref::from_ref(target);
        assert_eq!(r.ref_count(), 1);
        assert_eq!(*r, 5);
    }

    #[test]
    fn test_last_release_destroys_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let first = Ref::new(DropCounter(drops.clone()));
        let refs: Vec<_> = (0..4).map(|_| first.clone()).collect();
        let constant = first.to_const();
        assert_eq!(first.ref_count(), 6);

        drop(refs);
        drop(first);
        assert_eq!(drops.load(Ordering::SeqCst), 0, "one reference remains");
        assert_eq!(constant.ref_count(), 1);

        drop(constant);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_embedded_is_never_freed() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ptr = RefTarget::new(DropCounter(drops.clone()));
        let target = unsafe { ptr.as_ref() };
        target.set_embedded();
        drop(Ref::from_ref(target));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(target.ref_count(), EMBEDDED);
        // Reclaim by hand so the test does not leak.
        unsafe { drop(Box::from_raw(ptr.as_ptr())) };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_unreferenced_keeps_target() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ptr = Ref::new(DropCounter(drops.clone())).into_unreferenced();
        let target = unsafe { ptr.as_ref() };
        assert_eq!(target.ref_count(), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(Ref::from_ref(target));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ptr_equality() {
        let a = Ref::new(1_u8);
        let b = a.clone();
        let c = Ref::new(1_u8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
