//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary protocol between the injected probe and
//! the host:
//! - 12-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    channels, decode, encode, peek_length, subcodes, Header, HEADER_SIZE, MAX_UNPARSED_BYTES,
    PROTOCOL_VERSION,
};
