//! Heatmap mesh sub-encoding.
//!
//! A completed thermal run is shipped to the host as one `RegularMesh`:
//! the sampled window's geometry, the grid dimensions, and one mean
//! per-render cost per cell. Layout, native byte order, no padding:
//! ```text
//! offset 0:  physical_rect    i32 × 4 (x, y, w, h)
//! offset 16: rows             u32
//! offset 20: columns          u32
//! offset 24: mean_patch_size  f64
//! offset 32: data             f64 × rows*columns, row-major
//! ```

use crate::error::{ProbewireError, Result};

const MESH_HEADER: usize = 32;

/// An integer rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Area in square pixels (zero for degenerate rectangles).
    pub fn area(&self) -> i64 {
        if self.w <= 0 || self.h <= 0 {
            return 0;
        }
        i64::from(self.w) * i64::from(self.h)
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.x.to_ne_bytes());
        buf.extend_from_slice(&self.y.to_ne_bytes());
        buf.extend_from_slice(&self.w.to_ne_bytes());
        buf.extend_from_slice(&self.h.to_ne_bytes());
    }

    /// Serialize as a 16-byte payload (painting channel area frames).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        self.encode_into(&mut buf);
        buf
    }

    /// Deserialize from exactly 16 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 16 {
            return Err(ProbewireError::MalformedPayload(format!(
                "rect payload needs 16 bytes, got {}",
                buf.len()
            )));
        }
        Ok(Self {
            x: i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            y: i32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]),
            w: i32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]),
            h: i32::from_ne_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }
}

/// A completed heatmap: per-cell mean render cost over a regular grid.
///
/// Created once per completed thermal run, read-only after construction,
/// and transferred whole from probe to host in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularMesh {
    /// Window-space rectangle the grid covers.
    pub physical_rect: Rect,
    pub rows: u32,
    pub columns: u32,
    /// Mean cell area in square pixels.
    pub mean_patch_size: f64,
    /// Row-major per-cell values; `len == rows * columns`.
    data: Vec<f64>,
}

impl RegularMesh {
    /// Build a mesh, enforcing the `data.len() == rows * columns` invariant.
    pub fn new(
        physical_rect: Rect,
        rows: u32,
        columns: u32,
        mean_patch_size: f64,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = rows as usize * columns as usize;
        if data.len() != expected {
            return Err(ProbewireError::MalformedPayload(format!(
                "mesh data length {} does not match {rows}x{columns} grid",
                data.len()
            )));
        }
        Ok(Self {
            physical_rect,
            rows,
            columns,
            mean_patch_size,
            data,
        })
    }

    /// Per-cell values, row-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value for one cell, or `None` out of range.
    pub fn cell(&self, row: u32, column: u32) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.data
            .get(row as usize * self.columns as usize + column as usize)
            .copied()
    }

    /// Serialize into a frame payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MESH_HEADER + self.data.len() * 8);
        self.physical_rect.encode_into(&mut buf);
        buf.extend_from_slice(&self.rows.to_ne_bytes());
        buf.extend_from_slice(&self.columns.to_ne_bytes());
        buf.extend_from_slice(&self.mean_patch_size.to_ne_bytes());
        for value in &self.data {
            buf.extend_from_slice(&value.to_ne_bytes());
        }
        buf
    }

    /// Deserialize from a frame payload, validating the exact length.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MESH_HEADER {
            return Err(ProbewireError::MalformedPayload(format!(
                "mesh payload needs at least {MESH_HEADER} bytes, got {}",
                buf.len()
            )));
        }
        let physical_rect = Rect::decode(&buf[0..16])?;
        let rows = u32::from_ne_bytes([buf[16], buf[17], buf[18], buf[19]]);
        let columns = u32::from_ne_bytes([buf[20], buf[21], buf[22], buf[23]]);
        let mean_patch_size = f64::from_ne_bytes([
            buf[24], buf[25], buf[26], buf[27], buf[28], buf[29], buf[30], buf[31],
        ]);

        let cells = rows as usize * columns as usize;
        let expected = MESH_HEADER + cells * 8;
        if buf.len() != expected {
            return Err(ProbewireError::MalformedPayload(format!(
                "mesh payload is {} bytes, {rows}x{columns} grid requires {expected}",
                buf.len()
            )));
        }

        let mut data = Vec::with_capacity(cells);
        for chunk in buf[MESH_HEADER..].chunks_exact(8) {
            data.push(f64::from_ne_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ]));
        }
        Self::new(physical_rect, rows, columns, mean_patch_size, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_roundtrip() {
        let rect = Rect::new(-3, 7, 640, 480);
        assert_eq!(Rect::decode(&rect.encode()).unwrap(), rect);
        assert_eq!(rect.area(), 640 * 480);
        assert_eq!(Rect::new(0, 0, -1, 5).area(), 0);
    }

    #[test]
    fn mesh_roundtrip() {
        let data: Vec<f64> = (0..12).map(|i| i as f64 * 0.25).collect();
        let mesh = RegularMesh::new(Rect::new(0, 0, 300, 200), 3, 4, 5000.0, data).unwrap();
        let decoded = RegularMesh::decode(&mesh.encode()).unwrap();
        assert_eq!(decoded, mesh);
        assert_eq!(decoded.cell(2, 3), Some(11.0 * 0.25));
        assert_eq!(decoded.cell(3, 0), None);
    }

    #[test]
    fn mesh_rejects_wrong_data_length() {
        let err = RegularMesh::new(Rect::default(), 2, 2, 1.0, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ProbewireError::MalformedPayload(_)));
    }

    #[test]
    fn mesh_decode_rejects_length_mismatch() {
        let mesh =
            RegularMesh::new(Rect::new(0, 0, 10, 10), 1, 2, 50.0, vec![1.0, 2.0]).unwrap();
        let mut bytes = mesh.encode();
        bytes.truncate(bytes.len() - 8);
        let err = RegularMesh::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProbewireError::MalformedPayload(_)));
    }
}
