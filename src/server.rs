//! Host-side comm server.
//!
//! Accepts exactly one inbound connection from the injected probe,
//! reassembles the frame stream, and fans decoded messages out through a
//! [`DispatchRegistry`]. Connection lifecycle changes are surfaced as
//! [`ServerEvent`]s so the embedding UI can show connect/disconnect status;
//! nothing else propagates upward — decode and dispatch failures are logged
//! and dropped locally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::DispatchRegistry;
use crate::error::{ProbewireError, Result};
use crate::protocol::{FrameBuffer, MAX_UNPARSED_BYTES, PROTOCOL_VERSION};
use crate::transport::{endpoint_path, generate_endpoint_name, PipeListener};

/// Configuration for the comm server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Prefix for the generated endpoint name.
    pub endpoint_prefix: String,
    /// Unparsed receive-buffer cap; see
    /// [`MAX_UNPARSED_BYTES`](crate::protocol::MAX_UNPARSED_BYTES).
    pub max_unparsed_bytes: usize,
    /// Socket read chunk size.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint_prefix: "probewire".to_string(),
            max_unparsed_bytes: MAX_UNPARSED_BYTES,
            read_buffer_size: 64 * 1024,
        }
    }
}

/// Connection lifecycle notifications for the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// A probe connected and is now the live session.
    Connected,
    /// The live session ended; the server accepts a new probe again.
    Disconnected,
    /// A second probe tried to connect while a session was active and was
    /// refused. The live session is untouched.
    ConnectionRejected,
    /// The unparsed receive buffer blew the safety cap and was discarded.
    /// The connection stays up.
    BufferOverrun,
    /// The probe announced a protocol revision other than ours.
    VersionMismatch { probe: u8, host: u8 },
}

/// Host-side comm server owning the local endpoint and the single live
/// probe connection.
pub struct CommServer {
    endpoint: String,
    path: String,
    connected: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
}

impl CommServer {
    /// Bind a fresh endpoint and start accepting.
    ///
    /// Returns the server handle and the receiver for [`ServerEvent`]s. The
    /// endpoint name is randomized per session
    /// (`"<prefix>_<time+millis+random>"`) so concurrent debug sessions on
    /// one machine never collide; pass it to the injection mechanism via
    /// [`endpoint`](Self::endpoint) or
    /// [`announce`](crate::announce::write_announcement).
    pub async fn bind(
        config: ServerConfig,
        registry: DispatchRegistry,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>)> {
        let endpoint = generate_endpoint_name(&config.endpoint_prefix);
        let path = endpoint_path(&endpoint);
        let listener = PipeListener::bind(&path).await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(registry),
            events_tx,
            connected.clone(),
            config,
        ));

        Ok((
            Self {
                endpoint,
                path,
                connected,
                accept_task,
            },
            events_rx,
        ))
    }

    /// The session's endpoint name.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The platform path of the endpoint.
    pub fn endpoint_os_path(&self) -> &str {
        &self.path
    }

    /// Whether a probe session is currently live.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stop accepting and tear the server down.
    pub fn shutdown(self) {
        self.accept_task.abort();
    }
}

impl Drop for CommServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: PipeListener,
    registry: Arc<DispatchRegistry>,
    events: mpsc::UnboundedSender<ServerEvent>,
    connected: Arc<AtomicBool>,
    config: ServerConfig,
) {
    loop {
        let stream = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("comm server: accept failed: {e}");
                return;
            }
        };

        // One live connection only. A concurrent second probe is refused,
        // and the refusal is surfaced instead of silently dropped.
        if connected.swap(true, Ordering::AcqRel) {
            tracing::warn!("{}", ProbewireError::ConnectionRejected);
            let _ = events.send(ServerEvent::ConnectionRejected);
            drop(stream);
            continue;
        }

        let _ = events.send(ServerEvent::Connected);

        // The session runs as its own task so the accept loop stays free to
        // observe (and reject) further connection attempts.
        let registry = registry.clone();
        let events = events.clone();
        let connected = connected.clone();
        let config = config.clone();
        tokio::spawn(async move {
            read_session(stream, &registry, &events, &config).await;
            connected.store(false, Ordering::Release);
            let _ = events.send(ServerEvent::Disconnected);
        });
    }
}

/// Drive one live connection until EOF or a read error.
async fn read_session(
    mut stream: crate::transport::PipeStream,
    registry: &DispatchRegistry,
    events: &mpsc::UnboundedSender<ServerEvent>,
    config: &ServerConfig,
) {
    let mut frame_buffer = FrameBuffer::with_max_unparsed(config.max_unparsed_bytes);
    let mut buf = vec![0u8; config.read_buffer_size];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::error!("comm server: read failed: {e}");
                break;
            }
        };

        match frame_buffer.push(&buf[..n]) {
            Ok(frames) => {
                for frame in frames {
                    check_hello(&frame, events);
                    if let Err(e) = registry.dispatch(&frame) {
                        tracing::warn!("comm server: {e}");
                    }
                }
            }
            Err(e) => {
                // The buffer already dropped its contents wholesale; the
                // connection itself keeps going.
                tracing::error!("comm server: {e}");
                let _ = events.send(ServerEvent::BufferOverrun);
            }
        }
    }
    // Partial-frame state never survives a connection.
    frame_buffer.clear();
}

/// Surface a hello frame carrying a foreign protocol revision. Mismatches are
/// visible but never fatal: both binaries are normally built together.
fn check_hello(frame: &crate::protocol::Frame, events: &mpsc::UnboundedSender<ServerEvent>) {
    use crate::protocol::{channels, subcodes};

    if frame.channel != channels::SERVICE || frame.subcode != subcodes::service::HELLO {
        return;
    }
    match frame.payload.first() {
        Some(&version) if version != PROTOCOL_VERSION => {
            tracing::warn!(
                "probe announced protocol revision {version}, host has {PROTOCOL_VERSION}"
            );
            let _ = events.send(ServerEvent::VersionMismatch {
                probe: version,
                host: PROTOCOL_VERSION,
            });
        }
        Some(_) => {}
        None => tracing::warn!("hello frame without a version byte"),
    }
}
