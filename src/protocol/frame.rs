//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame. Uses `bytes::Bytes` for zero-copy
//! payload sharing; frames are immutable once constructed.

use bytes::Bytes;

use super::wire_format::{channels, Header, HEADER_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message channel (see [`channels`]).
    pub channel: u32,
    /// Channel-specific subcode.
    pub subcode: u32,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from its routing pair and payload.
    pub fn new(channel: u32, subcode: u32, payload: Bytes) -> Self {
        Self {
            channel,
            subcode,
            payload,
        }
    }

    /// Create a frame copying the given payload bytes.
    pub fn from_parts(channel: u32, subcode: u32, payload: &[u8]) -> Self {
        Self {
            channel,
            subcode,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Total on-wire size of this frame, header included.
    #[inline]
    pub fn total_size(&self) -> u32 {
        (HEADER_SIZE + self.payload.len()) as u32
    }

    /// The header this frame serializes under.
    #[inline]
    pub fn header(&self) -> Header {
        Header::for_payload(self.channel, self.subcode, self.payload.len())
    }

    /// Serialize into a contiguous byte vector (header + payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.header().encode());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Whether this frame belongs to the painting channel.
    #[inline]
    pub fn is_painting(&self) -> bool {
        self.channel == channels::PAINTING
    }

    /// Whether this frame belongs to the events channel.
    #[inline]
    pub fn is_events(&self) -> bool {
        self.channel == channels::EVENTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::{decode, subcodes};

    #[test]
    fn frame_creation() {
        let frame = Frame::new(
            channels::EVENTS,
            subcodes::events::TIMING,
            Bytes::from_static(b"hello"),
        );
        assert_eq!(frame.channel, channels::EVENTS);
        assert_eq!(frame.subcode, subcodes::events::TIMING);
        assert_eq!(&frame.payload[..], b"hello");
        assert_eq!(frame.total_size(), 17);
        assert!(frame.is_events());
        assert!(!frame.is_painting());
    }

    #[test]
    fn frame_from_parts_copies() {
        let data = vec![1u8, 2, 3];
        let frame = Frame::from_parts(channels::PAINTING, subcodes::painting::MESH, &data);
        drop(data);
        assert_eq!(&frame.payload[..], &[1, 2, 3]);
    }

    #[test]
    fn to_bytes_roundtrips_through_decode() {
        let frame = Frame::from_parts(channels::GENERAL, subcodes::general::WARNING, b"slow");
        let decoded = decode(&frame.to_bytes()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn empty_payload_frame() {
        let frame = Frame::new(channels::PAINTING, subcodes::painting::BEGIN, Bytes::new());
        assert_eq!(frame.total_size(), 12);
        assert_eq!(frame.to_bytes().len(), 12);
    }
}
