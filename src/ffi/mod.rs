//! The exported C interface.
//!
//! Every function is `extern "C"`, named `rphys_<type>_<op>`, and passes
//! native objects as [handles]. Owned handles are released with the matching
//! `free`; reference-counted objects are held through `Ref` / `RefC`
//! handles whose `free` drops one reference.
//!
//! # Safety
//!
//! Every function taking a handle is `unsafe`. Handles are trusted: each one
//! must designate a live object of the handle's type, and a handle that is
//! freed must not be used again. A null handle is caught by an assertion and
//! aborts; dangling and mistyped handles are caught only with the
//! `checked-handles` feature. Functions writing to host buffers document
//! their buffer requirements individually.

#![allow(clippy::missing_safety_doc)]

/// Exports the reference-counting surface shared by every counted type:
/// count query, embedding, and the `Ref` handle (`to_ref`, `copy`, `free`,
/// `get_ptr`).
macro_rules! export_ref {
    (
        $target:ident, $ref_h:ident {
            get_ref_count: $get_ref_count:ident,
            set_embedded: $set_embedded:ident,
            to_ref: $to_ref:ident,
            copy: $copy:ident,
            free: $free:ident,
            get_ptr: $get_ptr:ident $(,)?
        }
    ) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get_ref_count(object: $target) -> u32 {
            unsafe { object.get() }.ref_count()
        }

        /// Mark the object as living inside another allocation so it is
        /// never freed by a release.
        #[no_mangle]
        pub unsafe extern "C" fn $set_embedded(object: $target) {
            unsafe { object.get() }.set_embedded()
        }

        /// Take a new reference. Free the returned handle to drop it.
        #[no_mangle]
        pub unsafe extern "C" fn $to_ref(object: $target) -> $ref_h {
            $ref_h::new_owned($crate::engine::Ref::from_ref(unsafe { object.get() }))
        }

        #[no_mangle]
        pub unsafe extern "C" fn $copy(reference: $ref_h) -> $ref_h {
            $ref_h::new_owned(unsafe { reference.get() }.clone())
        }

        /// Drop the reference; the object goes with the last one.
        #[no_mangle]
        pub unsafe extern "C" fn $free(reference: $ref_h) {
            unsafe { reference.free() }
        }

        #[no_mangle]
        pub unsafe extern "C" fn $get_ptr(reference: $ref_h) -> $target {
            $target::from_ptr(unsafe { reference.get() }.as_ptr())
        }
    };
}

/// Exports the read-only `RefC` handle of a counted type.
macro_rules! export_ref_c {
    (
        $target:ident, $ref_h:ident, $ref_c_h:ident {
            to_ref_c: $to_ref_c:ident,
            ref_to_ref_c: $ref_to_ref_c:ident,
            copy: $copy:ident,
            free: $free:ident,
            get_ptr: $get_ptr:ident $(,)?
        }
    ) => {
        #[no_mangle]
        pub unsafe extern "C" fn $to_ref_c(object: $target) -> $ref_c_h {
            $ref_c_h::new_owned($crate::engine::RefConst::from_ref(unsafe { object.get() }))
        }

        #[no_mangle]
        pub unsafe extern "C" fn $ref_to_ref_c(reference: $ref_h) -> $ref_c_h {
            $ref_c_h::new_owned(unsafe { reference.get() }.to_const())
        }

        #[no_mangle]
        pub unsafe extern "C" fn $copy(reference: $ref_c_h) -> $ref_c_h {
            $ref_c_h::new_owned(unsafe { reference.get() }.clone())
        }

        #[no_mangle]
        pub unsafe extern "C" fn $free(reference: $ref_c_h) {
            unsafe { reference.free() }
        }

        #[no_mangle]
        pub unsafe extern "C" fn $get_ptr(reference: $ref_c_h) -> $target {
            $target::from_ptr(unsafe { reference.get() }.as_ptr())
        }
    };
}

/// Exports the accessors of a result object type.
macro_rules! export_result {
    (
        $result_h:ident => $value_h:ident {
            create_default: $create_default:ident,
            free: $free:ident,
            is_empty: $is_empty:ident,
            is_valid: $is_valid:ident,
            has_error: $has_error:ident,
            get: $get:ident,
            get_error: $get_error:ident $(,)?
        }
    ) => {
        /// An empty result.
        #[no_mangle]
        pub extern "C" fn $create_default() -> $result_h {
            $result_h::new_owned(Default::default())
        }

        #[no_mangle]
        pub unsafe extern "C" fn $free(result: $result_h) {
            unsafe { result.free() }
        }

        #[no_mangle]
        pub unsafe extern "C" fn $is_empty(result: $result_h) -> bool {
            unsafe { result.get() }.is_empty()
        }

        #[no_mangle]
        pub unsafe extern "C" fn $is_valid(result: $result_h) -> bool {
            unsafe { result.get() }.is_valid()
        }

        #[no_mangle]
        pub unsafe extern "C" fn $has_error(result: $result_h) -> bool {
            unsafe { result.get() }.has_error()
        }

        /// A new reference to the value. Fatal unless the result is valid.
        #[no_mangle]
        pub unsafe extern "C" fn $get(result: $result_h) -> $value_h {
            $value_h::new_owned(unsafe { result.get() }.get().clone())
        }

        /// The error message; free it with `rphys_free_string`.
        #[no_mangle]
        pub unsafe extern "C" fn $get_error(result: $result_h) -> *mut std::ffi::c_char {
            $crate::ffi::buffer::into_c_string(unsafe { result.get() }.error_message())
        }
    };
}

pub mod body_settings;
pub mod buffer;
pub mod collector;
pub mod constraint;
pub mod handles;
pub mod library;
pub mod ray;
pub mod result;
pub mod scene;
pub mod shape;
pub mod shape_settings;
pub mod stream;
pub mod system;

pub use body_settings::*;
pub use collector::*;
pub use constraint::*;
pub use handles::*;
pub use library::*;
pub use ray::*;
pub use result::*;
pub use scene::*;
pub use shape::*;
pub use shape_settings::*;
pub use stream::*;
pub use system::*;

use crate::error::Error;

/// Decode an enum ordinal received from the host. An unknown ordinal is a
/// fatal precondition violation.
pub(crate) fn ordinal<T>(value: i32) -> T
where
    T: TryFrom<i32, Error = Error>,
{
    match T::try_from(value) {
        Ok(decoded) => decoded,
        Err(err) => panic!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MotionType;

    #[test]
    fn test_ordinal_decodes_known_value() {
        assert_eq!(ordinal::<MotionType>(2), MotionType::Dynamic);
    }

    #[test]
    #[should_panic(expected = "9 is not a valid MotionType ordinal")]
    fn test_unknown_ordinal_is_fatal() {
        ordinal::<MotionType>(9);
    }
}
