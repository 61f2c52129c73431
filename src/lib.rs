//! # probewire
//!
//! Probe-to-host profiling telemetry over a local socket.
//!
//! A host process (typically an IDE or debugger frontend) opens a
//! [`CommServer`] on a randomized local endpoint and announces it; a probe
//! injected into the inspected target process attaches with a
//! [`ProbeContext`] and streams telemetry back: per-event dispatch timings,
//! oversized-event diagnostics, and render-cost heatmaps produced by the
//! [`ThermalSampler`].
//!
//! ## Architecture
//!
//! - **Wire protocol** ([`protocol`]): length-prefixed frames with a 12-byte
//!   `(total_size, channel, subcode)` header, native byte order, reassembled
//!   from partial reads by [`FrameBuffer`].
//! - **Payloads** ([`codec`]): fixed native-endian sub-encodings for images,
//!   heatmap meshes and event records, decoded into the tagged
//!   [`TelemetryRecord`] enum.
//! - **Host side** ([`server`], [`dispatch`]): a single-connection comm
//!   server that fans decoded frames out by `(channel, subcode)` and surfaces
//!   connection lifecycle as [`ServerEvent`]s.
//! - **Probe side** ([`probe`]): the in-process session context, the
//!   event-dispatch interceptor and the thermal sampling engine, all running
//!   synchronously on the target's UI thread with a single-flight send path.
//!
//! ## Example
//!
//! ```ignore
//! use probewire::{CommServer, DispatchRegistry, ServerConfig, TelemetryRecord};
//!
//! #[tokio::main]
//! async fn main() -> probewire::Result<()> {
//!     let mut registry = DispatchRegistry::new();
//!     registry.register_channel(probewire::protocol::channels::PAINTING, |frame| {
//!         if let Ok(Some(record)) = TelemetryRecord::decode(frame) {
//!             println!("painting: {record:?}");
//!         }
//!     });
//!
//!     let (server, mut events) = CommServer::bind(ServerConfig::default(), registry).await?;
//!     probewire::announce::write_announcement(&probewire::announce::Announcement::new(
//!         server.endpoint(),
//!     ))?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("session: {event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod activation;
pub mod announce;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod writer;

pub use codec::{ImagePayload, Rect, RegularMesh, TelemetryRecord};
pub use dispatch::DispatchRegistry;
pub use error::{ProbewireError, Result};
pub use probe::{EventInterceptor, ProbeContext, ThermalConfig, ThermalSampler};
pub use protocol::{Frame, FrameBuffer};
pub use server::{CommServer, ServerConfig, ServerEvent};
