//! Image payload sub-encoding.
//!
//! Layout, native byte order, no padding:
//! ```text
//! offset 0:  width        i32
//! offset 4:  height       i32
//! offset 8:  pixel_format u32
//! offset 12: raw_bytes    (rest of payload)
//! ```

use bytes::Bytes;

use crate::error::{ProbewireError, Result};

const IMAGE_HEADER: usize = 12;

/// A raw framebuffer snapshot, sent as the thermal run's baseline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub width: i32,
    pub height: i32,
    /// Toolkit-specific pixel format tag; opaque to the protocol.
    pub pixel_format: u32,
    pub raw_bytes: Bytes,
}

impl ImagePayload {
    pub fn new(width: i32, height: i32, pixel_format: u32, raw_bytes: Bytes) -> Self {
        Self {
            width,
            height,
            pixel_format,
            raw_bytes,
        }
    }

    /// Serialize into a frame payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IMAGE_HEADER + self.raw_bytes.len());
        buf.extend_from_slice(&self.width.to_ne_bytes());
        buf.extend_from_slice(&self.height.to_ne_bytes());
        buf.extend_from_slice(&self.pixel_format.to_ne_bytes());
        buf.extend_from_slice(&self.raw_bytes);
        buf
    }

    /// Deserialize from a frame payload. Everything past the 12-byte prefix
    /// is the raw pixel data.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < IMAGE_HEADER {
            return Err(ProbewireError::MalformedPayload(format!(
                "image payload needs at least {IMAGE_HEADER} bytes, got {}",
                buf.len()
            )));
        }
        Ok(Self {
            width: i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            height: i32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]),
            pixel_format: u32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]),
            raw_bytes: Bytes::copy_from_slice(&buf[IMAGE_HEADER..]),
        })
    }
}
