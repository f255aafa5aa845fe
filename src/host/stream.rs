//! Binary state streams.

use crate::ffi::{self, RphysStreamIn, RphysStreamOut};

host_handle!(
    /// Collects the binary state written by `save_binary_state` calls.
    StreamOut(RphysStreamOut),
    free: ffi::rphys_stream_out_free,
    sync
);

impl StreamOut {
    pub fn new() -> Self {
        unsafe { Self::from_handle(ffi::rphys_stream_out_create()) }
    }

    pub fn len(&self) -> usize {
        unsafe { ffi::rphys_stream_out_size(self.handle) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_failed(&self) -> bool {
        unsafe { ffi::rphys_stream_out_is_failed(self.handle) }
    }

    /// Copy of everything written so far.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.len()];
        let copied = unsafe { ffi::rphys_stream_out_to_bytes(self.handle, bytes.as_mut_ptr(), bytes.len()) };
        bytes.truncate(copied);
        bytes
    }
}

impl Default for StreamOut {
    fn default() -> Self {
        Self::new()
    }
}

host_handle!(
    /// Feeds bytes to `restore_binary_state` calls.
    StreamIn(RphysStreamIn),
    free: ffi::rphys_stream_in_free,
    sync
);

impl StreamIn {
    /// A stream over a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        unsafe { Self::from_handle(ffi::rphys_stream_in_create_from_bytes(bytes.as_ptr(), bytes.len())) }
    }

    pub fn is_eof(&self) -> bool {
        unsafe { ffi::rphys_stream_in_is_eof(self.handle) }
    }

    pub fn is_failed(&self) -> bool {
        unsafe { ffi::rphys_stream_in_is_failed(self.handle) }
    }
}

impl From<&StreamOut> for StreamIn {
    fn from(out: &StreamOut) -> Self {
        StreamIn::from_bytes(&out.to_bytes())
    }
}
