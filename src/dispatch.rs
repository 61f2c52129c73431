//! Dispatch registry for routing decoded frames.
//!
//! The comm server routes each decoded frame by its `(channel, subcode)`
//! pair to whichever consumer registered interest. Dispatch runs
//! synchronously inside the server's read callback, so handlers must be
//! cheap; consumers that need real work forward the frame to their own
//! channel or task.

use std::collections::HashMap;

use crate::error::{ProbewireError, Result};
use crate::protocol::Frame;

/// A registered frame handler.
pub type HandlerFn = Box<dyn Fn(&Frame) + Send + Sync>;

/// Registry mapping `(channel, subcode)` pairs to handlers.
///
/// A handler can claim one exact pair or a whole channel; exact pairs win
/// over channel-wide registrations. Unrecognized pairs are reported as
/// [`UnhandledMessage`](ProbewireError::UnhandledMessage) for the caller to
/// log — non-fatal by design.
#[derive(Default)]
pub struct DispatchRegistry {
    exact: HashMap<(u32, u32), HandlerFn>,
    channel_wide: HashMap<u32, HandlerFn>,
}

impl DispatchRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one exact `(channel, subcode)` pair.
    ///
    /// A later registration for the same pair replaces the earlier one.
    pub fn register<F>(&mut self, channel: u32, subcode: u32, handler: F)
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.exact.insert((channel, subcode), Box::new(handler));
    }

    /// Register a handler for every subcode of a channel.
    pub fn register_channel<F>(&mut self, channel: u32, handler: F)
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.channel_wide.insert(channel, Box::new(handler));
    }

    /// Whether anything is registered for this pair.
    pub fn handles(&self, channel: u32, subcode: u32) -> bool {
        self.exact.contains_key(&(channel, subcode)) || self.channel_wide.contains_key(&channel)
    }

    /// Route one frame to its handler.
    ///
    /// # Errors
    ///
    /// [`UnhandledMessage`](ProbewireError::UnhandledMessage) when nothing is
    /// registered for the frame's pair.
    pub fn dispatch(&self, frame: &Frame) -> Result<()> {
        if let Some(handler) = self.exact.get(&(frame.channel, frame.subcode)) {
            handler(frame);
            return Ok(());
        }
        if let Some(handler) = self.channel_wide.get(&frame.channel) {
            handler(frame);
            return Ok(());
        }
        Err(ProbewireError::UnhandledMessage {
            channel: frame.channel,
            subcode: frame.subcode,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::protocol::{channels, subcodes};

    #[test]
    fn exact_pair_dispatch() {
        let mut registry = DispatchRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        registry.register(channels::PAINTING, subcodes::painting::BEGIN, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let frame = Frame::from_parts(channels::PAINTING, subcodes::painting::BEGIN, &[]);
        registry.dispatch(&frame).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exact_pair_wins_over_channel_wide() {
        let mut registry = DispatchRegistry::new();
        let exact_hits = Arc::new(AtomicUsize::new(0));
        let wide_hits = Arc::new(AtomicUsize::new(0));

        let counter = exact_hits.clone();
        registry.register(channels::EVENTS, subcodes::events::TIMING, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = wide_hits.clone();
        registry.register_channel(channels::EVENTS, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let timing = Frame::from_parts(channels::EVENTS, subcodes::events::TIMING, &[0u8; 8]);
        let diag = Frame::from_parts(channels::EVENTS, subcodes::events::DIAGNOSTIC, &[]);
        registry.dispatch(&timing).unwrap();
        registry.dispatch(&diag).unwrap();

        assert_eq!(exact_hits.load(Ordering::SeqCst), 1);
        assert_eq!(wide_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_pair_is_unhandled() {
        let registry = DispatchRegistry::new();
        let frame = Frame::from_parts(42, 9, &[]);
        let err = registry.dispatch(&frame).unwrap_err();
        assert!(matches!(
            err,
            ProbewireError::UnhandledMessage {
                channel: 42,
                subcode: 9
            }
        ));
        assert!(!registry.handles(42, 9));
    }
}
