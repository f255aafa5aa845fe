//! Marshaling between native values and host memory.
//!
//! Fixed-size results are written into host buffers whose declared capacity
//! must cover the result; a short buffer is a fatal precondition violation.
//! Variable-size results go through a [`PinnedArray`]: the native side fills
//! a temporary buffer, then copies as much as fits and commits.

use std::ffi::{c_char, CStr, CString};
use std::slice;

use glam::{DVec3, Quat, Vec3};

use crate::trace;

/// Write three floats.
///
/// # Safety
///
/// `ptr` must be valid for `capacity` writes.
pub unsafe fn store_vec3(ptr: *mut f32, capacity: usize, v: Vec3) {
    store(ptr, capacity, &v.to_array());
}

/// Write a quaternion as x, y, z, w.
///
/// # Safety
///
/// `ptr` must be valid for `capacity` writes.
pub unsafe fn store_quat(ptr: *mut f32, capacity: usize, q: Quat) {
    store(ptr, capacity, &q.to_array());
}

/// Write three doubles.
///
/// # Safety
///
/// `ptr` must be valid for `capacity` writes.
pub unsafe fn store_dvec3(ptr: *mut f64, capacity: usize, v: DVec3) {
    store(ptr, capacity, &v.to_array());
}

unsafe fn store<T: Copy>(ptr: *mut T, capacity: usize, values: &[T]) {
    assert!(
        capacity >= values.len(),
        "buffer capacity {} below the required {}",
        capacity,
        values.len()
    );
    assert!(!ptr.is_null(), "null output buffer");
    slice::from_raw_parts_mut(ptr, values.len()).copy_from_slice(values);
}

/// A host array borrowed for the duration of one native call.
pub struct PinnedArray<'a, T> {
    region: &'a mut [T],
}

impl<'a, T: Copy> PinnedArray<'a, T> {
    /// Pin `len` elements at `ptr`. A null pointer pins an empty region.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `len` writes for `'a`.
    pub unsafe fn pin(ptr: *mut T, len: usize) -> Self {
        let region = if ptr.is_null() || len == 0 {
            &mut []
        } else {
            slice::from_raw_parts_mut(ptr, len)
        };
        Self { region }
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Copy the head of `data` that fits and release the region.
    ///
    /// Returns the number of elements written.
    pub fn commit(self, data: &[T]) -> usize {
        let count = data.len().min(self.region.len());
        self.region[..count].copy_from_slice(&data[..count]);
        count
    }
}

/// Hand a string to the host. Release it with `rphys_free_string`.
pub fn into_c_string(s: &str) -> *mut c_char {
    let owned = CString::new(s.replace('\0', "")).unwrap_or_default();
    let ptr = owned.into_raw();
    trace::record_new::<CString>(ptr as u64);
    ptr
}

/// Reclaim a string produced by [`into_c_string`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must come from [`into_c_string`] and not have been freed.
pub unsafe fn free_c_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    trace::record_delete::<CString>(ptr as u64);
    drop(CString::from_raw(ptr));
}

/// Borrow a host string, replacing invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
pub unsafe fn read_c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_vec3_exact_capacity() {
        let mut buffer = [0.0_f32; 3];
        unsafe { store_vec3(buffer.as_mut_ptr(), 3, Vec3::new(1.0, 2.0, 3.0)) };
        assert_eq!(buffer, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_store_vec3_leaves_tail_untouched() {
        let mut buffer = [-1.0_f32; 5];
        unsafe { store_vec3(buffer.as_mut_ptr(), 5, Vec3::new(1.0, 2.0, 3.0)) };
        assert_eq!(buffer, [1.0, 2.0, 3.0, -1.0, -1.0]);
    }

    #[test]
    fn test_store_quat_order() {
        let mut buffer = [0.0_f32; 4];
        unsafe { store_quat(buffer.as_mut_ptr(), 4, Quat::from_xyzw(0.1, 0.2, 0.3, 0.9)) };
        assert_eq!(buffer, [0.1, 0.2, 0.3, 0.9]);
    }

    #[test]
    #[should_panic(expected = "buffer capacity 2 below the required 3")]
    fn test_short_buffer_is_fatal() {
        let mut buffer = [0.0_f64; 2];
        unsafe { store_dvec3(buffer.as_mut_ptr(), 2, DVec3::ONE) };
    }

    #[test]
    fn test_pinned_array_bounds_copy() {
        let mut buffer = [0_i32; 2];
        let pinned = unsafe { PinnedArray::pin(buffer.as_mut_ptr(), buffer.len()) };
        assert_eq!(pinned.capacity(), 2);
        assert_eq!(pinned.commit(&[7, 8, 9]), 2);
        assert_eq!(buffer, [7, 8]);

        let empty = unsafe { PinnedArray::<i32>::pin(std::ptr::null_mut(), 4) };
        assert_eq!(empty.commit(&[1]), 0);
    }

    #[test]
    fn test_c_string_round_trip() {
        let before = trace::live_allocations_of::<CString>();
        let ptr = into_c_string("Invalid radius");
        assert_eq!(unsafe { read_c_string(ptr) }, "Invalid radius");
        assert_eq!(trace::live_allocations_of::<CString>(), before + 1);
        unsafe { free_c_string(ptr) };
        assert_eq!(trace::live_allocations_of::<CString>(), before);
    }
}
