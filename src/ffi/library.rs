//! Library-wide queries and switches.

use std::ffi::c_char;

use crate::ffi::buffer::{free_c_string, into_c_string};
use crate::trace;

// ============================================================================
// Library
// ============================================================================

/// Version of the bindings as a string. Free with [`rphys_free_string`].
#[no_mangle]
pub extern "C" fn rphys_version_string() -> *mut c_char {
    into_c_string(crate::VERSION)
}

/// "Debug" or "Release". Free with [`rphys_free_string`].
#[no_mangle]
pub extern "C" fn rphys_build_type() -> *mut c_char {
    into_c_string(crate::build_type())
}

/// Whether positions are simulated in double precision. Locations still
/// cross the boundary as doubles.
#[no_mangle]
pub extern "C" fn rphys_is_double_precision() -> bool {
    false
}

/// Whether whole-object streams are available.
#[no_mangle]
pub extern "C" fn rphys_supports_object_stream() -> bool {
    true
}

/// Log every handle allocation and deallocation at trace level.
#[no_mangle]
pub extern "C" fn rphys_set_trace_allocations(setting: bool) {
    trace::set_trace_allocations(setting);
}

/// Net number of native objects allocated on the calling thread.
#[no_mangle]
pub extern "C" fn rphys_live_allocations() -> i64 {
    trace::live_allocations()
}

/// Free a string returned by this library.
///
/// # Safety
///
/// `s` must be null or a string returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn rphys_free_string(s: *mut c_char) {
    free_c_string(s);
}
