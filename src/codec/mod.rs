//! Codec module - payload sub-encodings.
//!
//! Frame payloads use small fixed layouts in host-native byte order, matching
//! the frame header itself:
//!
//! - [`ImagePayload`] - baseline window snapshots
//! - [`RegularMesh`] / [`Rect`] - heatmap meshes and area highlights
//! - [`TelemetryRecord`] - tagged decode of every known channel/subcode pair

mod image;
mod mesh;
mod record;

pub use image::ImagePayload;
pub use mesh::{Rect, RegularMesh};
pub use record::TelemetryRecord;
