//! Probe side - everything that runs inside the inspected target process.
//!
//! - [`ProbeContext`] - the one-per-process session state
//! - [`ProbeClient`] - the connect-and-send path back to the host
//! - [`EventInterceptor`] - event-dispatch timing and paint-overlay debugging
//! - [`ThermalSampler`] - the per-region render-cost heatmap engine

mod client;
mod context;
mod interceptor;
mod thermal;

pub use client::ProbeClient;
pub use context::ProbeContext;
pub use interceptor::{EventInfo, EventInterceptor, PaintSurface, SLOW_EVENT_THRESHOLD_MS};
pub use thermal::{
    partition_grid, RenderTarget, ThermalConfig, ThermalSampler, WindowEnumerator,
    MIN_TARGET_EXTENT,
};
