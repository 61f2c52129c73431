//! Wire format encoding and decoding.
//!
//! Implements the 12-byte header format:
//! ```text
//! ┌────────────┬──────────┬──────────┐
//! │ Total size │ Channel  │ Subcode  │
//! │ 4 bytes    │ 4 bytes  │ 4 bytes  │
//! │ u32 NE     │ u32 NE   │ u32 NE   │
//! └────────────┴──────────┴──────────┘
//! ```
//!
//! `total_size` includes the header itself, so a frame with an empty payload
//! declares 12. All integers are native byte order: host and probe always run
//! on the same machine, so no endianness negotiation takes place.
//!
//! The frame carries no version field. Instead, the probe opens every session
//! with a hello frame on the service channel carrying a single
//! [`PROTOCOL_VERSION`] byte, so host/probe builds that diverge are at least
//! visible in the log rather than silently desynchronized.

use bytes::Bytes;

use crate::error::{ProbewireError, Result};
use crate::protocol::Frame;

/// Header size in bytes (fixed, exactly 12).
pub const HEADER_SIZE: usize = 12;

/// Protocol revision carried by the service-channel hello frame.
pub const PROTOCOL_VERSION: u8 = 1;

/// Hard cap on unparsed receive-buffer growth (see [`FrameBuffer`]).
///
/// [`FrameBuffer`]: crate::protocol::FrameBuffer
pub const MAX_UNPARSED_BYTES: usize = 10_000_000;

/// Message channels. Coarse routing category for decoded frames.
pub mod channels {
    /// Session service traffic (version hello).
    pub const SERVICE: u32 = 0;
    /// Free-form text messages and warnings from the probe.
    pub const GENERAL: u32 = 1;
    /// Event-dispatch timing telemetry.
    pub const EVENTS: u32 = 2;
    /// Painting and thermal-analysis telemetry.
    pub const PAINTING: u32 = 3;
}

/// Per-channel subcodes.
pub mod subcodes {
    /// Service channel.
    pub mod service {
        /// Version hello, payload is one `PROTOCOL_VERSION` byte.
        pub const HELLO: u32 = 1;
    }

    /// General channel. Payloads are UTF-8 text.
    pub mod general {
        pub const MESSAGE: u32 = 1;
        pub const WARNING: u32 = 2;
    }

    /// Events channel.
    pub mod events {
        /// One elapsed-time `f64`, milliseconds.
        pub const TIMING: u32 = 0;
        /// Oversized-event diagnostic record.
        pub const DIAGNOSTIC: u32 = 1;
    }

    /// Painting channel, used by the thermal sampler.
    pub mod painting {
        pub const BEGIN: u32 = 1;
        pub const END: u32 = 2;
        /// ASCII decimal percentage payload.
        pub const PERCENT: u32 = 3;
        /// Baseline full-window snapshot (image sub-encoding).
        pub const BASELINE: u32 = 4;
        /// Completed heatmap (mesh sub-encoding).
        pub const MESH: u32 = 5;
        /// Highlighted area rectangle.
        pub const AREA: u32 = 6;
        /// Clear the highlighted area (empty payload).
        pub const AREA_CLEAR: u32 = 7;
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame size in bytes, including this 12-byte header.
    pub total_size: u32,
    /// Message channel (see [`channels`]).
    pub channel: u32,
    /// Channel-specific subcode (see [`subcodes`]).
    pub subcode: u32,
}

impl Header {
    /// Create a header for a payload of the given length.
    pub fn for_payload(channel: u32, subcode: u32, payload_len: usize) -> Self {
        Self {
            total_size: (HEADER_SIZE + payload_len) as u32,
            channel,
            subcode,
        }
    }

    /// Encode the header to bytes (native byte order).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.total_size.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.channel.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.subcode.to_ne_bytes());
        buf
    }

    /// Decode a header from bytes. Returns `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            total_size: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            channel: u32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]),
            subcode: u32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    /// Payload length declared by this header.
    ///
    /// Zero when `total_size` declares less than a full header; such frames
    /// are rejected by [`decode`] before this matters.
    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.total_size as usize).saturating_sub(HEADER_SIZE)
    }
}

/// Serialize a `(channel, subcode, payload)` triple into a self-describing
/// byte frame: 12-byte header followed by the payload, no padding.
pub fn encode(channel: u32, subcode: u32, payload: &[u8]) -> Vec<u8> {
    let header = Header::for_payload(channel, subcode, payload.len());
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

/// Peek the declared total frame length at the front of `buffer`.
///
/// Returns 0 if fewer than 4 bytes are available.
pub fn peek_length(buffer: &[u8]) -> u32 {
    if buffer.len() < 4 {
        return 0;
    }
    u32::from_ne_bytes([buffer[0], buffer[1], buffer[2], buffer[3]])
}

/// Decode one frame from the front of a possibly-partial receive buffer.
///
/// On success returns a [`Frame`] holding exactly `total_size - 12` payload
/// bytes. The caller is responsible for removing `total_size` bytes from the
/// front of the buffer afterwards (accumulate-and-slice, not an in-place
/// streaming parse).
///
/// # Errors
///
/// - [`TruncatedHeader`](ProbewireError::TruncatedHeader) with fewer than 4
///   bytes available — retry later, not fatal.
/// - [`IncompleteFrame`](ProbewireError::IncompleteFrame) when the buffer
///   holds less than the declared `total_size` — retry later, not fatal.
/// - [`MalformedPayload`](ProbewireError::MalformedPayload) when the declared
///   size is smaller than the header itself; the format offers no way to
///   resynchronize past such a frame.
pub fn decode(buffer: &[u8]) -> Result<Frame> {
    if buffer.len() < 4 {
        return Err(ProbewireError::TruncatedHeader);
    }
    let declared = peek_length(buffer);
    if (declared as usize) < HEADER_SIZE {
        return Err(ProbewireError::MalformedPayload(format!(
            "declared total size {declared} is smaller than the {HEADER_SIZE}-byte header"
        )));
    }
    if buffer.len() < declared as usize {
        return Err(ProbewireError::IncompleteFrame {
            declared,
            available: buffer.len(),
        });
    }
    // Header presence is implied by declared >= HEADER_SIZE <= buffer.len().
    let header = match Header::decode(buffer) {
        Some(h) => h,
        None => return Err(ProbewireError::TruncatedHeader),
    };
    let payload = Bytes::copy_from_slice(&buffer[HEADER_SIZE..declared as usize]);
    Ok(Frame::new(header.channel, header.subcode, payload))
}
