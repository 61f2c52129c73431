//! Generic activation state machine.
//!
//! Several units of work share one lifecycle: they can be requested, possibly
//! denied while a global enable toggle is off, run for a while, and
//! eventually wind down. This module implements that shape once —
//! `Idle -> Waiting -> Active -> Deactivating -> Idle` with an explicit
//! transition function — instead of re-deriving it per subsystem.

/// Lifecycle states of an activatable unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Nothing requested.
    #[default]
    Idle,
    /// Requested, not yet granted.
    Waiting,
    /// Running.
    Active,
    /// Finished, winding down.
    Deactivating,
}

/// Inputs to the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationEvent {
    /// Ask to start. Denied (stays `Idle`) while the machine is disabled.
    Request,
    /// Grant a pending request.
    Grant,
    /// Deny a pending request.
    Deny,
    /// The work completed.
    Finish,
    /// Wind-down completed.
    Settle,
}

/// Pure transition function. Events that do not apply to the current state
/// leave it unchanged.
pub fn step(state: Activation, event: ActivationEvent, enabled: bool) -> Activation {
    use Activation::*;
    use ActivationEvent::*;

    match (state, event) {
        (Idle, Request) if enabled => Waiting,
        (Idle, Request) => Idle,
        (Waiting, Grant) => Active,
        (Waiting, Deny) => Idle,
        (Active, Finish) => Deactivating,
        (Deactivating, Settle) => Idle,
        (state, _) => state,
    }
}

/// An activation machine with its enable toggle.
#[derive(Debug, Default)]
pub struct ActivationMachine {
    state: Activation,
    enabled: bool,
}

impl ActivationMachine {
    /// Create a machine in `Idle`, enabled or not.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Activation::Idle,
            enabled,
        }
    }

    /// Current state.
    pub fn state(&self) -> Activation {
        self.state
    }

    /// Flip the global enable toggle. Work already past `Waiting` is not
    /// interrupted; the toggle only gates new requests.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Feed one event through the transition function, returning the new
    /// state.
    pub fn apply(&mut self, event: ActivationEvent) -> Activation {
        self.state = step(self.state, event, self.enabled);
        self.state
    }

    /// Convenience: request and report whether the request was admitted.
    pub fn request(&mut self) -> bool {
        self.apply(ActivationEvent::Request) == Activation::Waiting
    }
}
