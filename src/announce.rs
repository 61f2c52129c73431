//! Control-plane endpoint announcement.
//!
//! The probe learns the session's endpoint name out-of-band: the host prints
//! a single JSON line to stdout, and the injection mechanism relays it into
//! the target process. One line, flushed immediately, nothing else on stdout
//! — logs belong on stderr.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::protocol::PROTOCOL_VERSION;

/// The announcement the host publishes for the injection mechanism.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// Endpoint name the probe should connect to.
    pub endpoint: String,
    /// Protocol revision the host was built with.
    pub protocol_version: u8,
}

impl Announcement {
    /// Build an announcement for an endpoint name.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Serialize to the single-line JSON form.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write an announcement line to stdout.
///
/// Uses an explicit `\n` rather than `println!` so Windows builds never emit
/// `\r\n`, and flushes immediately — the consumer waits for a complete line.
pub fn write_announcement(announcement: &Announcement) -> Result<()> {
    let line = announcement.to_json_line()?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}
