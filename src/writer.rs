//! Dedicated writer task for the probe's send path.
//!
//! The probe emits telemetry from the target's UI thread, which is not a
//! tokio context, so frames are handed to a dedicated writer task over a
//! single-slot channel and the sender blocks until the write completes or a
//! deadline passes.
//!
//! ```text
//! UI thread ──► WriterHandle::send ──► single-slot channel ──► writer task ──► socket
//! ```
//!
//! Exactly one send may be in flight at a time. The `fencing` flag guards
//! re-entrancy: a send issued while another is still in flight is dropped
//! with a logged error, never queued, so telemetry is silently lost under
//! load. That is a known limitation of this protocol, not a queue waiting to
//! be added.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ProbewireError, Result};
use crate::protocol::{Header, HEADER_SIZE};

/// Default deadline for a single frame write.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// How long a send may take before it is abandoned as a
    /// [`SendFailure`](ProbewireError::SendFailure).
    pub send_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// A frame ready to be written to the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded header (12 bytes).
    header: [u8; HEADER_SIZE],
    /// Payload bytes (may be empty for marker frames).
    payload: Bytes,
}

impl OutboundFrame {
    /// Build an outbound frame from its routing pair and payload.
    pub fn new(channel: u32, subcode: u32, payload: Bytes) -> Self {
        Self {
            header: Header::for_payload(channel, subcode, payload.len()).encode(),
            payload,
        }
    }

}

struct Outbound {
    frame: OutboundFrame,
    done: std_mpsc::Sender<Result<()>>,
}

/// Handle for pushing frames to the writer task.
///
/// Cheaply cloneable; the fencing flag is shared, so every clone observes
/// the same single-flight discipline.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Outbound>,
    /// True while a send is in flight.
    fencing: Arc<AtomicBool>,
    timeout: Duration,
}

impl WriterHandle {
    /// Send one frame, blocking until the write completes or the deadline
    /// passes.
    ///
    /// Intended to be called from the target's UI thread (not from inside an
    /// async task). Failure modes, all of which lose this message and leave
    /// the session running:
    ///
    /// - [`Fenced`](ProbewireError::Fenced): another send is in flight.
    /// - [`SendFailure`](ProbewireError::SendFailure): the write missed its
    ///   deadline.
    /// - [`Disconnected`](ProbewireError::Disconnected): the writer task is
    ///   gone.
    pub fn send(&self, frame: OutboundFrame) -> Result<()> {
        if self.fencing.swap(true, Ordering::AcqRel) {
            tracing::error!("telemetry send dropped: another send is still in flight");
            return Err(ProbewireError::Fenced);
        }
        let result = self.send_locked(frame);
        self.fencing.store(false, Ordering::Release);
        if let Err(ref e) = result {
            tracing::error!("telemetry send failed: {e}");
        }
        result
    }

    /// Whether a send is currently in flight.
    #[inline]
    pub fn is_fencing(&self) -> bool {
        self.fencing.load(Ordering::Acquire)
    }

    fn send_locked(&self, frame: OutboundFrame) -> Result<()> {
        let (done_tx, done_rx) = std_mpsc::channel();
        self.tx
            .try_send(Outbound {
                frame,
                done: done_tx,
            })
            .map_err(|e| match e {
                // The slot still holds a previously abandoned send.
                mpsc::error::TrySendError::Full(_) => ProbewireError::Fenced,
                mpsc::error::TrySendError::Closed(_) => ProbewireError::Disconnected,
            })?;

        match done_rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                Err(ProbewireError::SendFailure(self.timeout))
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => Err(ProbewireError::Disconnected),
        }
    }
}

/// Spawn the writer task and return a handle for sending frames.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    // Single-slot channel: the fencing flag admits at most one frame.
    let (tx, rx) = mpsc::channel(1);
    let handle = WriterHandle {
        tx,
        fencing: Arc::new(AtomicBool::new(false)),
        timeout: config.send_timeout,
    };
    let task = tokio::spawn(writer_loop(rx, writer));
    (handle, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Outbound>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(out) = rx.recv().await {
        let result = write_frame(&mut writer, &out.frame).await;
        let failed = result.is_err();
        if let Err(ref e) = result {
            tracing::error!("writer task: socket write failed: {e}");
        }
        // The sender may have given up already (deadline passed); that is
        // fine, the result is simply dropped.
        let _ = out.done.send(result);
        if failed {
            return;
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.header).await?;
    if !frame.payload.is_empty() {
        writer.write_all(&frame.payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{channels, decode, subcodes};
    use tokio::io::AsyncReadExt;

    #[test]
    fn outbound_frame_header_matches_payload() {
        let frame = OutboundFrame::new(
            channels::EVENTS,
            subcodes::events::TIMING,
            Bytes::from_static(&[0u8; 8]),
        );
        let header = Header::decode(&frame.header).unwrap();
        assert_eq!(header.total_size, 20);
        assert_eq!(header.channel, channels::EVENTS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn send_writes_one_frame() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (handle, _task) = spawn_writer_task(client, WriterConfig::default());

        let sent = tokio::task::spawn_blocking(move || {
            handle.send(OutboundFrame::new(
                channels::GENERAL,
                subcodes::general::MESSAGE,
                Bytes::from_static(b"hello"),
            ))
        })
        .await
        .unwrap();
        sent.unwrap();

        let mut buf = vec![0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        let frame = decode(&buf[..n]).unwrap();
        assert_eq!(frame.channel, channels::GENERAL);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fencing_drops_concurrent_send() {
        let (client, _server) = tokio::io::duplex(4096);
        let (handle, _task) = spawn_writer_task(client, WriterConfig::default());

        // Simulate an in-flight send by holding the fencing flag.
        handle.fencing.store(true, Ordering::Release);
        let result = handle.send(OutboundFrame::new(
            channels::EVENTS,
            subcodes::events::TIMING,
            Bytes::from_static(&[0u8; 8]),
        ));
        assert!(matches!(result, Err(ProbewireError::Fenced)));

        // The fencing flag is untouched by the dropped send.
        assert!(handle.is_fencing());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_socket_is_a_send_failure() {
        // A 16-byte duplex fills immediately and nobody drains it, so the
        // large write can never complete.
        let (client, _server_kept_alive) = tokio::io::duplex(16);
        let (handle, _task) = spawn_writer_task(
            client,
            WriterConfig {
                send_timeout: Duration::from_millis(50),
            },
        );

        let payload = Bytes::from(vec![0u8; 4096]);
        let result = tokio::task::spawn_blocking(move || {
            handle.send(OutboundFrame::new(
                channels::PAINTING,
                subcodes::painting::BASELINE,
                payload,
            ))
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(ProbewireError::SendFailure(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn closed_writer_is_disconnected() {
        let (client, server) = tokio::io::duplex(4096);
        let (handle, task) = spawn_writer_task(client, WriterConfig::default());

        // Drop the read side and push one frame through so the writer task
        // observes the closed pipe and exits.
        drop(server);
        let h = handle.clone();
        let _ = tokio::task::spawn_blocking(move || {
            h.send(OutboundFrame::new(
                channels::GENERAL,
                subcodes::general::MESSAGE,
                Bytes::from(vec![0u8; 8192]),
            ))
        })
        .await
        .unwrap();
        task.await.unwrap();

        let result = tokio::task::spawn_blocking(move || {
            handle.send(OutboundFrame::new(
                channels::GENERAL,
                subcodes::general::MESSAGE,
                Bytes::from_static(b"late"),
            ))
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(ProbewireError::Disconnected)));
    }
}
