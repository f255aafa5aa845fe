//! Binary state streams and whole-object streams.
//!
//! [`StreamOut`] and [`StreamIn`] carry the `save_binary_state` /
//! `restore_binary_state` encodings. Failures latch: once a stream has
//! failed every further read or write is refused, and the owner checks
//! [`StreamOut::is_failed`] / [`StreamIn::is_failed`] at the end, the same
//! way a C++ iostream reports errors.

use std::io::{self, Cursor, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::StreamType;

/// In-memory output stream.
#[derive(Debug, Default)]
pub struct StreamOut {
    buffer: Vec<u8>,
    failed: bool,
}

impl StreamOut {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `value` at the end of the stream.
    pub fn write_state<T: Serialize>(&mut self, value: &T) {
        if self.failed {
            return;
        }
        if let Err(err) = bincode::serialize_into(&mut self.buffer, value) {
            log::warn!("stream write failed: {}", err);
            self.failed = true;
        }
    }

    /// Whether a write failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the stream, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.buffer
    }
}

impl Write for StreamOut {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory input stream.
#[derive(Debug, Default)]
pub struct StreamIn {
    cursor: Cursor<Vec<u8>>,
    failed: bool,
}

impl StreamIn {
    /// Create a stream reading `data` from the start.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
            failed: false,
        }
    }

    /// Decode the next value, or `None` once the stream has failed.
    pub fn read_state<T: DeserializeOwned>(&mut self) -> Option<T> {
        if self.failed {
            return None;
        }
        match bincode::deserialize_from(&mut self.cursor) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("stream read failed: {}", err);
                self.failed = true;
                None
            }
        }
    }

    /// Whether a read failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Whether every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }
}

impl Read for StreamIn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

const TEXT_HEADER: &[u8] = b"TOS1.0\n";
const BINARY_HEADER: &[u8] = b"BOS1.0\n";

/// Write a whole object in the requested encoding, behind a header naming
/// the encoding.
pub fn write_object<T: Serialize>(stream_type: StreamType, value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match stream_type {
        StreamType::Text => {
            bytes.extend_from_slice(TEXT_HEADER);
            serde_json::to_writer_pretty(&mut bytes, value)?;
        }
        StreamType::Binary => {
            bytes.extend_from_slice(BINARY_HEADER);
            bincode::serialize_into(&mut bytes, value)?;
        }
    }
    Ok(bytes)
}

/// Read a whole object written by [`write_object`], in either encoding.
pub fn read_object<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    if let Some(body) = data.strip_prefix(TEXT_HEADER) {
        Ok(serde_json::from_slice(body)?)
    } else if let Some(body) = data.strip_prefix(BINARY_HEADER) {
        Ok(bincode::deserialize(body)?)
    } else {
        Err(Error::Serialization("not an object stream".to_string()))
    }
}
