//! Probe session context.
//!
//! Exactly one probe session exists per target process. Rather than
//! file-scope statics, all of its state lives in one explicit [`ProbeContext`]
//! constructed on attach and dropped on detach: the send client, the
//! debug-paint toggle, the thermal work gate, and the monotonic counters.
//! The fencing flag itself lives inside the writer handle, which is the send
//! path it guards.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::activation::{Activation, ActivationEvent, ActivationMachine};
use crate::codec::TelemetryRecord;
use crate::error::Result;
use crate::writer::WriterConfig;

use super::client::ProbeClient;

/// Per-session probe state.
pub struct ProbeContext {
    client: ProbeClient,
    /// When set, paint events get a translucent overlay for flicker
    /// detection.
    debug_paint: AtomicBool,
    /// Gate for thermal runs: requests are denied while instrumentation is
    /// disabled or a run is already active.
    work_gate: Mutex<ActivationMachine>,
    /// Lock-free mirror of the gate's enable toggle, for the interceptor's
    /// per-event check.
    enabled: AtomicBool,
    /// Lock-free mirror of "a thermal run owns the process": the interceptor
    /// must not instrument the sampler's synthetic renders.
    thermal_active: AtomicBool,
    /// Monotonic intercepted-event counter.
    event_counter: AtomicU64,
    /// Monotonic paint-overlay counter.
    paint_counter: AtomicU64,
}

impl ProbeContext {
    /// Connect to the host and build the session context.
    pub async fn attach(endpoint: &str, config: WriterConfig) -> Result<Arc<Self>> {
        let client = ProbeClient::connect(endpoint, config).await?;
        Ok(Arc::new(Self::with_client(client)))
    }

    /// Build a context around an already-connected client. Instrumentation
    /// starts enabled.
    pub fn with_client(client: ProbeClient) -> Self {
        Self {
            client,
            debug_paint: AtomicBool::new(false),
            work_gate: Mutex::new(ActivationMachine::new(true)),
            enabled: AtomicBool::new(true),
            thermal_active: AtomicBool::new(false),
            event_counter: AtomicU64::new(0),
            paint_counter: AtomicU64::new(0),
        }
    }

    /// The underlying send client.
    pub fn client(&self) -> &ProbeClient {
        &self.client
    }

    /// Send one typed record over the session.
    pub fn send_record(&self, record: &TelemetryRecord) -> Result<()> {
        self.client.send_record(record)
    }

    /// Toggle the paint-overlay debug aid.
    pub fn set_debug_paint(&self, enabled: bool) {
        self.debug_paint.store(enabled, Ordering::Release);
    }

    pub fn debug_paint(&self) -> bool {
        self.debug_paint.load(Ordering::Acquire)
    }

    /// Globally enable or disable probe work. Disabling denies new thermal
    /// requests and silences the interceptor; work already running is not
    /// interrupted.
    pub fn set_instrumentation_enabled(&self, enabled: bool) {
        self.work_gate
            .lock()
            .expect("work gate poisoned")
            .set_enabled(enabled);
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn instrumentation_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Whether a thermal run currently owns the process.
    pub fn thermal_in_progress(&self) -> bool {
        self.thermal_active.load(Ordering::Acquire)
    }

    /// Claim the thermal slot through the activation gate. Returns false
    /// when the request is denied: instrumentation disabled, or a run
    /// already active.
    pub(crate) fn begin_thermal(&self) -> bool {
        let mut gate = self.work_gate.lock().expect("work gate poisoned");
        if !gate.request() {
            return false;
        }
        let granted = gate.apply(ActivationEvent::Grant) == Activation::Active;
        if granted {
            self.thermal_active.store(true, Ordering::Release);
        }
        granted
    }

    pub(crate) fn end_thermal(&self) {
        let mut gate = self.work_gate.lock().expect("work gate poisoned");
        gate.apply(ActivationEvent::Finish);
        gate.apply(ActivationEvent::Settle);
        self.thermal_active.store(false, Ordering::Release);
    }

    /// Next value of the monotonic event counter.
    pub(crate) fn next_event_serial(&self) -> u64 {
        self.event_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Next value of the monotonic paint-operation counter.
    pub(crate) fn next_paint_serial(&self) -> u64 {
        self.paint_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
