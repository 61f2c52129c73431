//! Probe-side send client.
//!
//! Connects to the host's announced endpoint, opens the session with a
//! version hello, and exposes the blocking single-flight send path. The
//! probe never reads from the socket: telemetry flows one way, and the host
//! has no abort message to send back.

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::codec::TelemetryRecord;
use crate::error::{ProbewireError, Result};
use crate::protocol::PROTOCOL_VERSION;
use crate::transport::{connect, endpoint_path};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterConfig, WriterHandle};

/// The probe's connection to the host.
pub struct ProbeClient {
    writer: WriterHandle,
    _writer_task: Option<JoinHandle<()>>,
}

impl ProbeClient {
    /// Connect to the host endpoint and send the version hello.
    pub async fn connect(endpoint: &str, config: WriterConfig) -> Result<Self> {
        let path = endpoint_path(endpoint);
        let stream = connect(&path).await?;
        let (_read_half, write_half) = stream.into_split();
        let (writer, task) = spawn_writer_task(write_half, config);

        let client = Self {
            writer,
            _writer_task: Some(task),
        };

        // The hello is the first frame on the wire; it is the only place the
        // protocol revision appears.
        let hello = client.writer.clone();
        tokio::task::spawn_blocking(move || {
            hello.send(OutboundFrame::new(
                crate::protocol::channels::SERVICE,
                crate::protocol::subcodes::service::HELLO,
                Bytes::copy_from_slice(&[PROTOCOL_VERSION]),
            ))
        })
        .await
        .map_err(|_| ProbewireError::Disconnected)??;

        Ok(client)
    }

    /// Wrap an existing writer handle (tests, or embedders supplying their
    /// own transport).
    pub fn from_writer(writer: WriterHandle) -> Self {
        Self {
            writer,
            _writer_task: None,
        }
    }

    /// Send one raw frame. Blocking; see
    /// [`WriterHandle::send`](crate::writer::WriterHandle::send) for the
    /// failure modes — all of them lose the message and keep the session.
    pub fn send(&self, channel: u32, subcode: u32, payload: Bytes) -> Result<()> {
        self.writer.send(OutboundFrame::new(channel, subcode, payload))
    }

    /// Send one typed record.
    pub fn send_record(&self, record: &TelemetryRecord) -> Result<()> {
        self.send(
            record.channel(),
            record.subcode(),
            Bytes::from(record.encode_payload()),
        )
    }

    /// Whether a send is currently in flight.
    pub fn is_fencing(&self) -> bool {
        self.writer.is_fencing()
    }
}
