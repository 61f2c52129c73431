//! Error types for probewire.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all probewire operations.
///
/// The retry-class variants ([`TruncatedHeader`](ProbewireError::TruncatedHeader),
/// [`IncompleteFrame`](ProbewireError::IncompleteFrame)) signal that the
/// deframer needs more bytes; everything else is handled locally by logging
/// and dropping the offending data or aborting the operation in progress.
#[derive(Debug, Error)]
pub enum ProbewireError {
    /// Fewer than four bytes buffered; the declared frame length cannot be
    /// read yet. Retry once more data arrives.
    #[error("truncated header: need at least 4 bytes to read the frame length")]
    TruncatedHeader,

    /// The frame declares more bytes than are currently buffered. Retry once
    /// more data arrives.
    #[error("incomplete frame: declared {declared} bytes, {available} available")]
    IncompleteFrame { declared: u32, available: usize },

    /// The unparsed receive buffer exceeded the safety cap. The entire
    /// buffered state has been discarded; the connection itself continues.
    #[error("unparsed receive buffer exceeded {0} bytes, discarded")]
    OversizedBuffer(usize),

    /// A second probe tried to connect while a session was active. The new
    /// connection is refused; the live session is untouched.
    #[error("probe connection rejected: a session is already active")]
    ConnectionRejected,

    /// A decoded frame carries a channel/subcode pair nobody registered for.
    /// Logged and ignored, non-fatal.
    #[error("no handler registered for channel {channel} subcode {subcode}")]
    UnhandledMessage { channel: u32, subcode: u32 },

    /// A probe-side send was dropped by the re-entrancy guard because another
    /// send was still in flight. The telemetry for that message is lost.
    #[error("send dropped: another send is still in flight")]
    Fenced,

    /// A socket write did not complete within the configured deadline. The
    /// telemetry for that message is lost; the session continues.
    #[error("send did not complete within {0:?}")]
    SendFailure(Duration),

    /// A unit of probe work was requested while instrumentation is disabled
    /// or another unit is still running.
    #[error("probe work denied: instrumentation disabled or busy")]
    WorkDenied,

    /// The probe session is no longer connected; the message was not sent.
    #[error("probe session disconnected")]
    Disconnected,

    /// The thermal sampler found no visible window of usable size. The
    /// operation aborts without partial results and without any wire traffic.
    #[error("no eligible target window for thermal sampling")]
    NoEligibleTarget,

    /// A payload sub-encoding could not be decoded (short buffer, length
    /// mismatch, bad text). The frame is dropped.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// I/O error on the local socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while building the control-plane announcement.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbewireError {
    /// True for the deframer's "feed me more bytes" conditions, which are not
    /// failures.
    pub fn is_retry(&self) -> bool {
        matches!(
            self,
            ProbewireError::TruncatedHeader | ProbewireError::IncompleteFrame { .. }
        )
    }
}

/// Result type alias using ProbewireError.
pub type Result<T> = std::result::Result<T, ProbewireError>;
