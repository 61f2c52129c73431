//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Socket reads are
//! appended as they arrive; complete frames are sliced off the front
//! (accumulate-and-slice), leaving any trailing partial frame buffered for
//! the next push.
//!
//! A hard safety cap bounds unparsed growth: a malformed or malicious
//! producer can declare an enormous frame length and never deliver the bytes,
//! pinning the buffer forever. Past [`MAX_UNPARSED_BYTES`] the entire buffer
//! is discarded and an error is returned — the framing format carries no
//! resynchronization marker, so partial recovery is not attempted.

use bytes::BytesMut;

use super::wire_format::{peek_length, Header, HEADER_SIZE, MAX_UNPARSED_BYTES};
use super::Frame;
use crate::error::{ProbewireError, Result};

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Unparsed-growth cap; exceeding it drops the whole buffer.
    max_unparsed: usize,
}

impl FrameBuffer {
    /// Create a frame buffer with the default 10 MB unparsed cap.
    pub fn new() -> Self {
        Self::with_max_unparsed(MAX_UNPARSED_BYTES)
    }

    /// Create a frame buffer with a custom unparsed cap.
    pub fn with_max_unparsed(max_unparsed: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_unparsed,
        }
    }

    /// Push newly received data and extract all complete frames.
    ///
    /// Loops the classic way: peek the declared length, break if the buffer
    /// holds less, otherwise slice exactly that many bytes off the front and
    /// decode them. Returns the decoded frames in arrival order (possibly
    /// empty while a frame is still partial).
    ///
    /// # Errors
    ///
    /// - [`OversizedBuffer`](ProbewireError::OversizedBuffer) once the
    ///   undecodable remainder exceeds the cap. The buffer is fully cleared
    ///   first; a well-formed frame arriving afterwards decodes normally.
    /// - [`MalformedPayload`](ProbewireError::MalformedPayload) when a frame
    ///   declares a total size smaller than the header. The buffer is cleared
    ///   for the same no-resynchronization reason.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            let declared = peek_length(&self.buffer) as usize;
            if declared == 0 && self.buffer.len() < 4 {
                break;
            }
            if declared < HEADER_SIZE {
                self.clear();
                return Err(ProbewireError::MalformedPayload(format!(
                    "declared total size {declared} is smaller than the {HEADER_SIZE}-byte header"
                )));
            }
            if self.buffer.len() < declared {
                break;
            }

            // Slice exactly one frame off the front; freeze makes the payload
            // a zero-copy view of the receive buffer.
            let frame_bytes = self.buffer.split_to(declared).freeze();
            let header = match Header::decode(&frame_bytes) {
                Some(h) => h,
                None => {
                    self.clear();
                    return Err(ProbewireError::TruncatedHeader);
                }
            };
            let payload = frame_bytes.slice(HEADER_SIZE..);
            frames.push(Frame::new(header.channel, header.subcode, payload));
        }

        if self.buffer.len() > self.max_unparsed {
            self.clear();
            return Err(ProbewireError::OversizedBuffer(self.max_unparsed));
        }

        Ok(frames)
    }

    /// Number of buffered, not-yet-decodable bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no pending bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard all buffered state (used on disconnect and overrun).
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
