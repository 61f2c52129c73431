//! Typed telemetry records.
//!
//! [`TelemetryRecord`] is the tagged-variant form of a decoded frame: every
//! known `(channel, subcode)` pair maps to one variant, so consumers match on
//! an enum instead of re-interpreting raw payload bytes at each call site.
//! The probe encodes records to payloads; the host decodes payloads back.

use bytes::Bytes;

use super::image::ImagePayload;
use super::mesh::{Rect, RegularMesh};
use crate::error::{ProbewireError, Result};
use crate::protocol::{channels, subcodes, Frame};

/// One decoded telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    /// Session-opening version hello (service channel).
    Hello { version: u8 },
    /// Free-form text from the probe.
    Text(String),
    /// Warning text from the probe.
    Warning(String),
    /// Per-event dispatch cost, milliseconds.
    EventTiming { elapsed_ms: f64 },
    /// Detail record for an event that exceeded the slow threshold.
    EventDiagnostic {
        /// Monotonic event counter at emission time.
        counter: u64,
        /// Toolkit-numeric event type.
        event_type: u32,
        elapsed_ms: f64,
        /// Receiving object's class name, or the literal `"null"`.
        receiver_class: String,
    },
    /// Thermal run started.
    ThermalBegin,
    /// Thermal run finished; the mesh frame precedes this.
    ThermalEnd,
    /// Thermal run progress percentage.
    ThermalProgress { percent: u32 },
    /// Full-window snapshot taken before sampling begins.
    BaselineImage(ImagePayload),
    /// Completed heatmap.
    Mesh(RegularMesh),
    /// Highlight an area of the target window.
    Area(Rect),
    /// Clear the highlighted area.
    AreaClear,
}

impl TelemetryRecord {
    /// Wire channel this record travels on.
    pub fn channel(&self) -> u32 {
        match self {
            TelemetryRecord::Hello { .. } => channels::SERVICE,
            TelemetryRecord::Text(_) | TelemetryRecord::Warning(_) => channels::GENERAL,
            TelemetryRecord::EventTiming { .. } | TelemetryRecord::EventDiagnostic { .. } => {
                channels::EVENTS
            }
            _ => channels::PAINTING,
        }
    }

    /// Wire subcode within [`channel`](Self::channel).
    pub fn subcode(&self) -> u32 {
        match self {
            TelemetryRecord::Hello { .. } => subcodes::service::HELLO,
            TelemetryRecord::Text(_) => subcodes::general::MESSAGE,
            TelemetryRecord::Warning(_) => subcodes::general::WARNING,
            TelemetryRecord::EventTiming { .. } => subcodes::events::TIMING,
            TelemetryRecord::EventDiagnostic { .. } => subcodes::events::DIAGNOSTIC,
            TelemetryRecord::ThermalBegin => subcodes::painting::BEGIN,
            TelemetryRecord::ThermalEnd => subcodes::painting::END,
            TelemetryRecord::ThermalProgress { .. } => subcodes::painting::PERCENT,
            TelemetryRecord::BaselineImage(_) => subcodes::painting::BASELINE,
            TelemetryRecord::Mesh(_) => subcodes::painting::MESH,
            TelemetryRecord::Area(_) => subcodes::painting::AREA,
            TelemetryRecord::AreaClear => subcodes::painting::AREA_CLEAR,
        }
    }

    /// Serialize this record's payload bytes.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            TelemetryRecord::Hello { version } => vec![*version],
            TelemetryRecord::Text(text) | TelemetryRecord::Warning(text) => {
                text.as_bytes().to_vec()
            }
            TelemetryRecord::EventTiming { elapsed_ms } => elapsed_ms.to_ne_bytes().to_vec(),
            TelemetryRecord::EventDiagnostic {
                counter,
                event_type,
                elapsed_ms,
                receiver_class,
            } => {
                let name = receiver_class.as_bytes();
                let mut buf = Vec::with_capacity(24 + name.len());
                buf.extend_from_slice(&counter.to_ne_bytes());
                buf.extend_from_slice(&event_type.to_ne_bytes());
                buf.extend_from_slice(&elapsed_ms.to_ne_bytes());
                buf.extend_from_slice(&(name.len() as u32).to_ne_bytes());
                buf.extend_from_slice(name);
                buf
            }
            TelemetryRecord::ThermalBegin
            | TelemetryRecord::ThermalEnd
            | TelemetryRecord::AreaClear => Vec::new(),
            TelemetryRecord::ThermalProgress { percent } => percent.to_string().into_bytes(),
            TelemetryRecord::BaselineImage(image) => image.encode(),
            TelemetryRecord::Mesh(mesh) => mesh.encode(),
            TelemetryRecord::Area(rect) => rect.encode(),
        }
    }

    /// Build the complete frame for this record.
    pub fn to_frame(&self) -> Frame {
        Frame::new(
            self.channel(),
            self.subcode(),
            Bytes::from(self.encode_payload()),
        )
    }

    /// Decode a frame into a typed record.
    ///
    /// Returns `Ok(None)` for channel/subcode pairs this protocol does not
    /// define (the caller logs them as unhandled), and
    /// [`MalformedPayload`](ProbewireError::MalformedPayload) when the pair is
    /// known but the payload does not parse.
    pub fn decode(frame: &Frame) -> Result<Option<TelemetryRecord>> {
        let p = &frame.payload;
        let record = match (frame.channel, frame.subcode) {
            (channels::SERVICE, subcodes::service::HELLO) => {
                let version = *p.first().ok_or_else(|| {
                    ProbewireError::MalformedPayload("hello frame missing version byte".into())
                })?;
                TelemetryRecord::Hello { version }
            }
            (channels::GENERAL, subcodes::general::MESSAGE) => {
                TelemetryRecord::Text(String::from_utf8_lossy(p).into_owned())
            }
            (channels::GENERAL, subcodes::general::WARNING) => {
                TelemetryRecord::Warning(String::from_utf8_lossy(p).into_owned())
            }
            (channels::EVENTS, subcodes::events::TIMING) => TelemetryRecord::EventTiming {
                elapsed_ms: decode_f64(p, 0, "event timing")?,
            },
            (channels::EVENTS, subcodes::events::DIAGNOSTIC) => decode_diagnostic(p)?,
            (channels::PAINTING, subcodes::painting::BEGIN) => TelemetryRecord::ThermalBegin,
            (channels::PAINTING, subcodes::painting::END) => TelemetryRecord::ThermalEnd,
            (channels::PAINTING, subcodes::painting::PERCENT) => {
                let text = std::str::from_utf8(p).map_err(|_| {
                    ProbewireError::MalformedPayload("progress payload is not ASCII".into())
                })?;
                let percent = text.trim().parse::<u32>().map_err(|_| {
                    ProbewireError::MalformedPayload(format!(
                        "progress payload {text:?} is not a decimal percentage"
                    ))
                })?;
                TelemetryRecord::ThermalProgress { percent }
            }
            (channels::PAINTING, subcodes::painting::BASELINE) => {
                TelemetryRecord::BaselineImage(ImagePayload::decode(p)?)
            }
            (channels::PAINTING, subcodes::painting::MESH) => {
                TelemetryRecord::Mesh(RegularMesh::decode(p)?)
            }
            (channels::PAINTING, subcodes::painting::AREA) => {
                TelemetryRecord::Area(Rect::decode(p)?)
            }
            (channels::PAINTING, subcodes::painting::AREA_CLEAR) => TelemetryRecord::AreaClear,
            _ => return Ok(None),
        };
        Ok(Some(record))
    }
}

fn decode_f64(buf: &[u8], offset: usize, what: &str) -> Result<f64> {
    let end = offset + 8;
    if buf.len() < end {
        return Err(ProbewireError::MalformedPayload(format!(
            "{what} payload needs {end} bytes, got {}",
            buf.len()
        )));
    }
    Ok(f64::from_ne_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ]))
}

fn decode_diagnostic(buf: &[u8]) -> Result<TelemetryRecord> {
    if buf.len() < 24 {
        return Err(ProbewireError::MalformedPayload(format!(
            "event diagnostic needs at least 24 bytes, got {}",
            buf.len()
        )));
    }
    let counter = u64::from_ne_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ]);
    let event_type = u32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let elapsed_ms = decode_f64(buf, 12, "event diagnostic")?;
    let name_len = u32::from_ne_bytes([buf[20], buf[21], buf[22], buf[23]]) as usize;
    if buf.len() != 24 + name_len {
        return Err(ProbewireError::MalformedPayload(format!(
            "event diagnostic declares {name_len}-byte class name, payload is {} bytes",
            buf.len()
        )));
    }
    Ok(TelemetryRecord::EventDiagnostic {
        counter,
        event_type,
        elapsed_ms,
        receiver_class: String::from_utf8_lossy(&buf[24..]).into_owned(),
    })
}
