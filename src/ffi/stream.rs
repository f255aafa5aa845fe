//! Exported functions for binary state streams and object streams.

use std::io::{Read, Write};
use std::slice;

use crate::engine::scene::SceneState;
use crate::engine::stream::{read_object, write_object};
use crate::engine::{BodyCreationSettings, PhysicsScene, StreamIn, StreamOut};
use crate::ffi::buffer::PinnedArray;
use crate::ffi::handles::*;
use crate::ffi::ordinal;
use crate::types::StreamType;

// ============================================================================
// StreamOut
// ============================================================================

#[no_mangle]
pub extern "C" fn rphys_stream_out_create() -> RphysStreamOut {
    RphysStreamOut::new_owned(StreamOut::new())
}

#[no_mangle]
pub unsafe extern "C" fn rphys_stream_out_free(stream: RphysStreamOut) {
    unsafe { stream.free() }
}

/// Number of bytes written so far.
#[no_mangle]
pub unsafe extern "C" fn rphys_stream_out_size(stream: RphysStreamOut) -> usize {
    unsafe { stream.get() }.len()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_stream_out_is_failed(stream: RphysStreamOut) -> bool {
    unsafe { stream.get() }.is_failed()
}

/// Copy up to `capacity` bytes of the stream into `out`. Returns the number
/// of bytes copied.
///
/// # Safety
///
/// `out` must be valid for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn rphys_stream_out_to_bytes(stream: RphysStreamOut, out: *mut u8, capacity: usize) -> usize {
    PinnedArray::pin(out, capacity).commit(stream.get().data())
}

// ============================================================================
// StreamIn
// ============================================================================

/// A stream reading a copy of `len` bytes at `data`.
///
/// # Safety
///
/// `data` must be null or valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn rphys_stream_in_create_from_bytes(data: *const u8, len: usize) -> RphysStreamIn {
    let bytes = if data.is_null() || len == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(data, len).to_vec()
    };
    RphysStreamIn::new_owned(StreamIn::new(bytes))
}

#[no_mangle]
pub unsafe extern "C" fn rphys_stream_in_free(stream: RphysStreamIn) {
    unsafe { stream.free() }
}

#[no_mangle]
pub unsafe extern "C" fn rphys_stream_in_is_eof(stream: RphysStreamIn) -> bool {
    unsafe { stream.get() }.is_eof()
}

#[no_mangle]
pub unsafe extern "C" fn rphys_stream_in_is_failed(stream: RphysStreamIn) -> bool {
    unsafe { stream.get() }.is_failed()
}

// ============================================================================
// Object streams
// ============================================================================

fn stream_of(bytes: crate::Result<Vec<u8>>) -> RphysStreamOut {
    match bytes {
        Ok(bytes) => {
            let mut stream = StreamOut::new();
            // Writing to memory cannot fail.
            let _ = stream.write_all(&bytes);
            RphysStreamOut::new_owned(stream)
        }
        Err(err) => {
            log::warn!("object stream write failed: {}", err);
            RphysStreamOut::invalid()
        }
    }
}

/// Everything left to read in `stream`.
fn remaining(stream: RphysStreamIn) -> Option<Vec<u8>> {
    let stream = unsafe { stream.get_mut() };
    let mut bytes = Vec::new();
    match stream.read_to_end(&mut bytes) {
        Ok(_) => Some(bytes),
        Err(err) => {
            log::warn!("object stream read failed: {}", err);
            None
        }
    }
}

/// Write `settings` as a whole object. Returns a new stream holding the
/// encoding, or null on failure.
#[no_mangle]
pub unsafe extern "C" fn rphys_object_stream_out_write_body_creation_settings(
    settings: RphysBodyCreationSettings,
    stream_type: i32,
) -> RphysStreamOut {
    let stream_type: StreamType = ordinal(stream_type);
    stream_of(write_object(stream_type, unsafe { settings.get() }))
}

/// Write `scene`, shapes included, as a whole object. Returns a new stream
/// holding the encoding, or null on failure.
#[no_mangle]
pub unsafe extern "C" fn rphys_object_stream_out_write_physics_scene(
    scene: RphysPhysicsScene,
    stream_type: i32,
) -> RphysStreamOut {
    let stream_type: StreamType = ordinal(stream_type);
    stream_of(write_object(stream_type, &unsafe { scene.get() }.state(true)))
}

/// Read body settings written by
/// `rphys_object_stream_out_write_body_creation_settings`. Returns a new
/// handle, or null on failure.
#[no_mangle]
pub unsafe extern "C" fn rphys_object_stream_in_read_body_creation_settings(
    stream: RphysStreamIn,
) -> RphysBodyCreationSettings {
    let Some(bytes) = remaining(stream) else {
        return RphysBodyCreationSettings::invalid();
    };
    match read_object::<BodyCreationSettings>(&bytes) {
        Ok(settings) => RphysBodyCreationSettings::new_owned(settings),
        Err(err) => {
            log::warn!("cannot read body creation settings: {}", err);
            RphysBodyCreationSettings::invalid()
        }
    }
}

/// Read a scene written by `rphys_object_stream_out_write_physics_scene`.
/// Returns a new reference, or null on failure.
#[no_mangle]
pub unsafe extern "C" fn rphys_object_stream_in_read_physics_scene(stream: RphysStreamIn) -> RphysPhysicsSceneRef {
    let Some(bytes) = remaining(stream) else {
        return RphysPhysicsSceneRef::invalid();
    };
    let state = match read_object::<SceneState>(&bytes) {
        Ok(state) => state,
        Err(err) => {
            log::warn!("cannot read physics scene: {}", err);
            return RphysPhysicsSceneRef::invalid();
        }
    };
    match PhysicsScene::from_state(&state).into_result(crate::Error::SceneRestore) {
        Ok(scene) => RphysPhysicsSceneRef::new_owned(scene),
        Err(err) => {
            log::warn!("{}", err);
            RphysPhysicsSceneRef::invalid()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes_is_bounded() {
        let stream = rphys_stream_out_create();
        unsafe { stream.get_mut() }.write_state(&0x0102_0304_u32);
        assert_eq!(unsafe { rphys_stream_out_size(stream) }, 4);

        let mut out = [0xffu8; 6];
        let copied = unsafe { rphys_stream_out_to_bytes(stream, out.as_mut_ptr(), 2) };
        assert_eq!(copied, 2);
        assert_eq!(out[2..], [0xff; 4]);
        unsafe { rphys_stream_out_free(stream) };
    }

    #[test]
    fn test_object_stream_text_round_trip() {
        let mut settings = BodyCreationSettings::default();
        settings.friction = 0.7;
        settings.user_data = 99;
        let handle = RphysBodyCreationSettings::new_owned(settings.clone());

        let out = unsafe { rphys_object_stream_out_write_body_creation_settings(handle, StreamType::Text.into()) };
        assert!(out.is_valid());
        let bytes = unsafe { out.get() }.data().to_vec();
        assert!(bytes.starts_with(b"TOS"));

        let input = unsafe { rphys_stream_in_create_from_bytes(bytes.as_ptr(), bytes.len()) };
        let restored = unsafe { rphys_object_stream_in_read_body_creation_settings(input) };
        assert!(restored.is_valid());
        assert_eq!(unsafe { restored.get() }.friction, 0.7);
        assert_eq!(unsafe { restored.get() }.user_data, 99);
        assert!(unsafe { rphys_stream_in_is_eof(input) });

        unsafe {
            restored.free();
            handle.free();
        }
        unsafe { rphys_stream_in_free(input) };
        unsafe { rphys_stream_out_free(out) };
    }

    #[test]
    fn test_garbage_reads_as_null() {
        let bytes = b"not an object";
        let input = unsafe { rphys_stream_in_create_from_bytes(bytes.as_ptr(), bytes.len()) };
        assert!(!unsafe { rphys_object_stream_in_read_body_creation_settings(input) }.is_valid());
        unsafe { rphys_stream_in_free(input) };
    }
}
