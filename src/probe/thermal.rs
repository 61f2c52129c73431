//! Thermal/frequency sampling engine.
//!
//! Measures per-region render cost of one visible window by partitioning its
//! client area into a grid and repeatedly rendering each cell off-screen,
//! wall-clock timing every burst. Per-cell samples are outlier-trimmed and
//! normalized into a mean-per-render cost, and the whole grid ships to the
//! host as one [`RegularMesh`].
//!
//! The run is a deliberately synchronous, long operation on the target's UI
//! thread: it starves the target's own event loop for its entire duration so
//! the measurements see raw render cost without interference. The target
//! appears frozen while it runs; that is accepted behavior. There is no
//! mid-run cancellation — the host cannot abort a pass, the run ends only
//! when the configured passes complete.

use std::time::Instant;

use crate::codec::{Rect, RegularMesh, TelemetryRecord};
use crate::error::{ProbewireError, Result};

use super::context::ProbeContext;

/// Windows smaller than this on either axis are skipped as degenerate
/// targets.
pub const MIN_TARGET_EXTENT: i32 = 50;

/// Sampling parameters.
///
/// The sampler itself performs no validation of the drop counts: with
/// `passes <= head_drops + tail_drops` the normalizer divides by a zero or
/// negative sample count and the mesh fills with NaN or zero. Validating
/// that `passes > head_drops + tail_drops` is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct ThermalConfig {
    /// Grid rows.
    pub rows: u32,
    /// Grid columns.
    pub columns: u32,
    /// Outer sampling passes; one sample per cell per pass.
    pub passes: u32,
    /// Renders per cell per pass, folded into each sample by repetition.
    pub inner_passes: u32,
    /// Lowest samples dropped per cell before averaging.
    pub head_drops: u32,
    /// Highest samples dropped per cell before averaging.
    pub tail_drops: u32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            columns: 10,
            passes: 5,
            inner_passes: 4,
            head_drops: 1,
            tail_drops: 1,
        }
    }
}

/// One window the sampler can drive.
///
/// Implemented by the embedder over the toolkit's window and off-screen
/// rendering facilities.
pub trait RenderTarget {
    /// The window's client-area rectangle.
    fn client_rect(&self) -> Rect;
    /// Render one region into an off-screen buffer.
    fn render_region(&mut self, region: Rect);
    /// Capture a full-window snapshot.
    fn snapshot(&mut self) -> crate::codec::ImagePayload;
}

/// Access to the process's visible top-level windows.
pub trait WindowEnumerator {
    /// Visible top-level windows, in toolkit order.
    fn visible_windows(&mut self) -> Vec<&mut dyn RenderTarget>;
}

/// Transient per-cell sampling state; lives only for the duration of one
/// thermal pass and is discarded after aggregation into the mesh.
struct TimedRect {
    rect: Rect,
    samples: Vec<f64>,
    aggregate_time: f64,
}

/// The sampling engine.
pub struct ThermalSampler<'a> {
    ctx: &'a ProbeContext,
    config: ThermalConfig,
}

impl<'a> ThermalSampler<'a> {
    pub fn new(ctx: &'a ProbeContext, config: ThermalConfig) -> Self {
        Self { ctx, config }
    }

    /// Run one complete thermal pass over the first eligible window.
    ///
    /// Exactly one window is processed per invocation: the first visible
    /// top-level window at least 50x50. If none qualifies the operation logs
    /// and returns [`NoEligibleTarget`](ProbewireError::NoEligibleTarget)
    /// without sending anything — not even begin/end markers, so consumers
    /// must never assume a begin frame implies an eventual end frame.
    ///
    /// Returns the mesh that was sent, for the embedder's own use.
    pub fn run(&self, windows: &mut dyn WindowEnumerator) -> Result<RegularMesh> {
        let target = windows.visible_windows().into_iter().find(|t| {
            let r = t.client_rect();
            r.w >= MIN_TARGET_EXTENT && r.h >= MIN_TARGET_EXTENT
        });
        let target = match target {
            Some(t) => t,
            None => {
                tracing::warn!("thermal sampling: no visible window of at least 50x50");
                return Err(ProbewireError::NoEligibleTarget);
            }
        };

        if !self.ctx.begin_thermal() {
            tracing::error!("thermal sampling: request denied (disabled or already running)");
            return Err(ProbewireError::WorkDenied);
        }
        let _guard = ThermalGuard(self.ctx);

        self.sample_window(target)
    }

    fn sample_window(&self, target: &mut dyn RenderTarget) -> Result<RegularMesh> {
        let cfg = &self.config;
        let rect = target.client_rect();

        let _ = self.ctx.send_record(&TelemetryRecord::ThermalBegin);

        // Baseline snapshot first, so the host has something to display long
        // before results exist.
        let baseline = target.snapshot();
        let _ = self
            .ctx
            .send_record(&TelemetryRecord::BaselineImage(baseline));

        let mut cells: Vec<TimedRect> = partition_grid(rect, cfg.rows, cfg.columns)
            .into_iter()
            .map(|rect| TimedRect {
                rect,
                samples: Vec::with_capacity(cfg.passes as usize),
                aggregate_time: 0.0,
            })
            .collect();

        // Progress roughly every 1% of the total work, throttled to at most
        // ~100 frames however large the grid is.
        let total = cfg.passes as usize * cells.len();
        let progress_step = (total / 100).max(1);
        let mut done = 0usize;

        for _pass in 0..cfg.passes {
            for cell in &mut cells {
                let started = Instant::now();
                for _ in 0..cfg.inner_passes {
                    target.render_region(cell.rect);
                }
                cell.samples
                    .push(started.elapsed().as_secs_f64() * 1000.0);

                done += 1;
                if done % progress_step == 0 {
                    let percent = (done * 100 / total) as u32;
                    let _ = self
                        .ctx
                        .send_record(&TelemetryRecord::ThermalProgress { percent });
                }
            }
        }

        for cell in &mut cells {
            cell.aggregate_time = trim_and_normalize(
                &cell.samples,
                cfg.passes,
                cfg.inner_passes,
                cfg.head_drops,
                cfg.tail_drops,
            );
        }

        let mean_patch_size =
            rect.area() as f64 / (f64::from(cfg.rows) * f64::from(cfg.columns));
        let data = cells.iter().map(|c| c.aggregate_time).collect();
        let mesh = RegularMesh::new(rect, cfg.rows, cfg.columns, mean_patch_size, data)?;

        let _ = self.ctx.send_record(&TelemetryRecord::Mesh(mesh.clone()));
        let _ = self.ctx.send_record(&TelemetryRecord::ThermalEnd);

        Ok(mesh)
    }
}

struct ThermalGuard<'a>(&'a ProbeContext);

impl Drop for ThermalGuard<'_> {
    fn drop(&mut self) {
        self.0.end_thermal();
    }
}

/// Partition a rectangle into a `rows x columns` grid by proportional
/// integer division. The last cell in each row and column absorbs the
/// rounding remainder, so the union exactly tiles the rectangle with no gaps
/// or overlaps, at the cost of slightly uneven tail cells.
pub fn partition_grid(rect: Rect, rows: u32, columns: u32) -> Vec<Rect> {
    let rows = rows.max(1) as i32;
    let columns = columns.max(1) as i32;
    let cell_w = rect.w / columns;
    let cell_h = rect.h / rows;

    let mut cells = Vec::with_capacity((rows * columns) as usize);
    for row in 0..rows {
        let y = rect.y + row * cell_h;
        let h = if row == rows - 1 {
            rect.h - row * cell_h
        } else {
            cell_h
        };
        for column in 0..columns {
            let x = rect.x + column * cell_w;
            let w = if column == columns - 1 {
                rect.w - column * cell_w
            } else {
                cell_w
            };
            cells.push(Rect::new(x, y, w, h));
        }
    }
    cells
}

/// Sort a cell's per-pass samples, drop the `head_drops` lowest and
/// `tail_drops` highest, and normalize the remaining sum to a mean
/// per-render cost: `sum / (inner_passes * (passes - head_drops -
/// tail_drops))`.
///
/// No validation: an over-dropped configuration yields a zero or negative
/// divisor (NaN or zero result), exactly as documented on [`ThermalConfig`].
fn trim_and_normalize(
    samples: &[f64],
    passes: u32,
    inner_passes: u32,
    head_drops: u32,
    tail_drops: u32,
) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let lo = (head_drops as usize).min(sorted.len());
    let hi = sorted.len().saturating_sub(tail_drops as usize).max(lo);
    let sum: f64 = sorted[lo..hi].iter().sum();

    let kept = f64::from(passes) - f64::from(head_drops) - f64::from(tail_drops);
    sum / (f64::from(inner_passes) * kept)
}
