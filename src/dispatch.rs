//! Submission gating and keyboard dispatch
//!
//! Each flow has one [`SubmitGate`]. A run holds the gate's [`GateGuard`]
//! from the moment its request is sent until the stream ends or fails, so
//! a second submission to the same flow is refused instead of interleaving
//! two streams into one response area.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::flows::FlowKind;

/// Single-slot lock guarding one flow's submit action
#[derive(Debug, Clone, Default)]
pub struct SubmitGate {
    busy: Arc<AtomicBool>,
}

impl SubmitGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate, or return `None` if a run already holds it
    ///
    /// # Examples
    ///
    /// ```
    /// use ragstream::dispatch::SubmitGate;
    ///
    /// let gate = SubmitGate::new();
    /// let guard = gate.try_acquire().unwrap();
    /// assert!(gate.try_acquire().is_none());
    /// drop(guard);
    /// assert!(gate.try_acquire().is_some());
    /// ```
    pub fn try_acquire(&self) -> Option<GateGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// A run currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds a [`SubmitGate`] closed; reopens it on drop
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Key press delivered to an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Submit
    Enter,
    /// Printable character
    Char(char),
    /// Anything else
    Other,
}

/// Routes Enter presses in a flow's input to that flow's submit action
#[derive(Debug, Clone)]
pub struct KeyDispatcher {
    gates: HashMap<FlowKind, SubmitGate>,
}

impl Default for KeyDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDispatcher {
    /// One open gate per flow
    pub fn new() -> Self {
        let gates = FlowKind::ALL
            .iter()
            .map(|kind| (*kind, SubmitGate::new()))
            .collect();
        Self { gates }
    }

    /// Gate for a flow
    pub fn gate(&self, flow: FlowKind) -> SubmitGate {
        self.gates.get(&flow).cloned().unwrap_or_default()
    }

    /// Decide whether a key press in `input` submits.
    ///
    /// Returns the flow to run for `Enter` when its gate is open; any other
    /// key, or `Enter` while a run is in flight, returns `None`.
    pub fn on_key(&self, input: FlowKind, key: Key) -> Option<FlowKind> {
        if key != Key::Enter {
            return None;
        }
        match self.gates.get(&input) {
            Some(gate) if gate.is_busy() => {
                tracing::debug!(flow = %input, "Submit ignored while a request is in flight");
                None
            }
            _ => Some(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let gate = SubmitGate::new();
        {
            let _guard = gate.try_acquire().unwrap();
            assert!(gate.is_busy());
        }
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = SubmitGate::new();
        let other = gate.clone();
        let _guard = gate.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_only_enter_submits() {
        let dispatcher = KeyDispatcher::new();
        assert_eq!(dispatcher.on_key(FlowKind::Web, Key::Char('a')), None);
        assert_eq!(dispatcher.on_key(FlowKind::Web, Key::Other), None);
        assert_eq!(
            dispatcher.on_key(FlowKind::Web, Key::Enter),
            Some(FlowKind::Web)
        );
    }

    #[test]
    fn test_busy_flow_rejects_enter_others_unaffected() {
        let dispatcher = KeyDispatcher::new();
        let _guard = dispatcher.gate(FlowKind::Smart).try_acquire().unwrap();
        assert_eq!(dispatcher.on_key(FlowKind::Smart, Key::Enter), None);
        assert_eq!(
            dispatcher.on_key(FlowKind::Llm, Key::Enter),
            Some(FlowKind::Llm)
        );
    }
}
