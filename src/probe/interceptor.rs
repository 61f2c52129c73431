//! Event-dispatch interceptor.
//!
//! Installed as the single global wrapper around the target toolkit's event
//! dispatch. The embedder routes every event through
//! [`EventInterceptor::intercept`], passing the real dispatch as a closure;
//! the interceptor times it inline on the UI thread and emits one timing
//! frame per event, plus a diagnostic frame for events slower than
//! [`SLOW_EVENT_THRESHOLD_MS`].
//!
//! The hot path never blocks beyond the send itself and never spawns
//! threads: any latency added here shows up directly in the numbers being
//! measured.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::codec::{Rect, TelemetryRecord};

use super::context::ProbeContext;

/// Events slower than this (milliseconds) get a detailed diagnostic frame.
pub const SLOW_EVENT_THRESHOLD_MS: f64 = 200.0;

/// What the toolkit shim knows about one event before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct EventInfo<'a> {
    /// Toolkit-numeric event type.
    pub event_type: u32,
    /// Class name of the receiving object, when the toolkit can name it.
    pub receiver_class: Option<&'a str>,
    /// Whether this is a paint event.
    pub is_paint: bool,
    /// The painted region, for paint events.
    pub paint_rect: Option<Rect>,
}

/// Where the debug-paint overlay is drawn.
///
/// Implemented by the embedder on top of whatever surface the toolkit hands
/// its paint handler.
pub trait PaintSurface {
    /// Fill a rectangle with a translucent RGBA color.
    fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]);
    /// Render the paint-operation counter inside the rectangle.
    fn draw_counter(&mut self, rect: Rect, value: u64);
}

/// The global event-dispatch wrapper.
pub struct EventInterceptor {
    ctx: Arc<ProbeContext>,
}

impl EventInterceptor {
    pub fn new(ctx: Arc<ProbeContext>) -> Self {
        Self { ctx }
    }

    /// Time one event dispatch and emit its telemetry.
    ///
    /// Returns whatever the wrapped dispatch returns. Send failures are
    /// logged by the send path and otherwise ignored here: losing a timing
    /// frame must never disturb the target's event handling.
    ///
    /// While a thermal run is in progress the interceptor stands down
    /// entirely, so the sampler's synthetic renders are not instrumented.
    pub fn intercept<R>(
        &self,
        info: &EventInfo<'_>,
        mut surface: Option<&mut dyn PaintSurface>,
        dispatch: impl FnOnce() -> R,
    ) -> R {
        if self.ctx.thermal_in_progress() || !self.ctx.instrumentation_enabled() {
            return dispatch();
        }

        let serial = self.ctx.next_event_serial();
        let start = Instant::now();
        let out = dispatch();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let _ = self
            .ctx
            .send_record(&TelemetryRecord::EventTiming { elapsed_ms });

        if elapsed_ms > SLOW_EVENT_THRESHOLD_MS {
            let _ = self.ctx.send_record(&TelemetryRecord::EventDiagnostic {
                counter: serial,
                event_type: info.event_type,
                elapsed_ms,
                receiver_class: info.receiver_class.unwrap_or("null").to_string(),
            });
        }

        if self.ctx.debug_paint() && info.is_paint {
            if let (Some(surface), Some(rect)) = (surface.as_deref_mut(), info.paint_rect) {
                self.overlay(surface, rect);
            }
        }

        out
    }

    /// Splash a pseudo-random translucent color over the repainted region
    /// and stamp the paint-operation counter, so repeated repaints of the
    /// same area are visible as flicker.
    fn overlay(&self, surface: &mut dyn PaintSurface, rect: Rect) {
        surface.fill_rect(rect, translucent_color());
        surface.draw_counter(rect, self.ctx.next_paint_serial());
    }
}

/// Pseudo-random RGB with fixed translucency, seeded from system time.
fn translucent_color() -> [u8; 4] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mixed = nanos.wrapping_mul(0x517c_c1b7_2722_0a95);
    let bytes = mixed.to_ne_bytes();
    [bytes[0], bytes[1], bytes[2], 96]
}
