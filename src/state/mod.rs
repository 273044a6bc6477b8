//! Authoritative device state - routing matrix, labels, locks
//!
//! [`HubState`] owns everything the protocol exposes: identity, the
//! crosspoint matrix, per-index labels, and per-output locks. It has no
//! knowledge of the network; the engine actor is its only owner and
//! serializes all access. Mutators detect no-op writes and report whether
//! the value actually changed, so callers never mark an index pending for
//! a write that left the state untouched.

use std::collections::BTreeSet;

use tracing::trace;

use crate::device::DeviceIdentity;

/// Authoritative store for one emulated device
#[derive(Debug, Clone)]
pub struct HubState {
    identity: DeviceIdentity,
    input_labels: Vec<String>,
    output_labels: Vec<String>,
    /// Output slot -> current source input. Every output maps to exactly
    /// one input in [0, input_count); initially output i sources input i.
    routing: Vec<usize>,
    output_locks: Vec<bool>,
}

impl HubState {
    /// Create a state store with identity-mapped routing and default labels
    pub fn new(identity: DeviceIdentity, input_count: usize, output_count: usize) -> Self {
        Self {
            identity,
            input_labels: (0..input_count).map(|i| format!("Input {}", i + 1)).collect(),
            output_labels: (0..output_count)
                .map(|i| format!("Output {}", i + 1))
                .collect(),
            routing: (0..output_count).map(|i| i.min(input_count.saturating_sub(1))).collect(),
            output_locks: vec![false; output_count],
        }
    }

    pub fn input_count(&self) -> usize {
        self.input_labels.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_labels.len()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn input_label(&self, index: usize) -> Option<&str> {
        self.input_labels.get(index).map(String::as_str)
    }

    pub fn output_label(&self, index: usize) -> Option<&str> {
        self.output_labels.get(index).map(String::as_str)
    }

    /// Current source input for an output slot
    pub fn route(&self, output: usize) -> Option<usize> {
        self.routing.get(output).copied()
    }

    pub fn lock(&self, output: usize) -> Option<bool> {
        self.output_locks.get(output).copied()
    }

    // =========================================================================
    // Mutators - all return the previous value only when something changed
    // =========================================================================

    /// Set an input label; returns the old label if the value changed
    pub fn set_input_label(&mut self, index: usize, label: &str) -> Option<String> {
        let slot = self.input_labels.get_mut(index)?;
        if slot == label {
            return None;
        }
        let old = std::mem::replace(slot, label.to_string());
        trace!(index, label, "Input label updated");
        Some(old)
    }

    /// Set an output label; returns the old label if the value changed
    pub fn set_output_label(&mut self, index: usize, label: &str) -> Option<String> {
        let slot = self.output_labels.get_mut(index)?;
        if slot == label {
            return None;
        }
        let old = std::mem::replace(slot, label.to_string());
        trace!(index, label, "Output label updated");
        Some(old)
    }

    /// Route an output to an input; returns the old input if the route changed
    ///
    /// The input index is not range-checked here; the dispatcher validates
    /// both indices before committing.
    pub fn set_route(&mut self, output: usize, input: usize) -> Option<usize> {
        let slot = self.routing.get_mut(output)?;
        if *slot == input {
            return None;
        }
        let old = std::mem::replace(slot, input);
        trace!(output, input, "Crosspoint updated");
        Some(old)
    }

    /// Set the lock state of an output; returns true if the state changed
    pub fn set_lock(&mut self, output: usize, locked: bool) -> bool {
        match self.output_locks.get_mut(output) {
            Some(slot) if *slot != locked => {
                *slot = locked;
                trace!(output, locked, "Lock updated");
                true
            }
            _ => false,
        }
    }

    /// Set the friendly name; returns the old name if it changed
    pub fn set_friendly_name(&mut self, name: &str) -> Option<String> {
        if self.identity.friendly_name == name {
            return None;
        }
        let old = std::mem::replace(&mut self.identity.friendly_name, name.to_string());
        trace!(name, "Friendly name updated");
        Some(old)
    }
}

/// Pending-change sets awaiting incremental broadcast
///
/// One sorted index set per category. An index enters a set only when the
/// corresponding value actually changed; the engine flushes and clears all
/// four sets once per read cycle.
#[derive(Debug, Default)]
pub struct PendingChanges {
    pub input_labels: BTreeSet<usize>,
    pub output_labels: BTreeSet<usize>,
    pub routing: BTreeSet<usize>,
    pub locks: BTreeSet<usize>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.input_labels.is_empty()
            && self.output_labels.is_empty()
            && self.routing.is_empty()
            && self.locks.is_empty()
    }

    /// Clear all four sets unconditionally
    pub fn clear(&mut self) {
        self.input_labels.clear();
        self.output_labels.clear();
        self.routing.clear();
        self.locks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceIdentity, DeviceType};

    fn state(inputs: usize, outputs: usize) -> HubState {
        let identity = DeviceIdentity::new(DeviceType::SmartVideohub, None);
        HubState::new(identity, inputs, outputs)
    }

    #[test]
    fn test_initial_state() {
        let s = state(4, 4);
        assert_eq!(s.input_label(0), Some("Input 1"));
        assert_eq!(s.output_label(3), Some("Output 4"));
        assert_eq!(s.route(2), Some(2));
        assert_eq!(s.lock(0), Some(false));
    }

    #[test]
    fn test_noop_writes_return_none() {
        let mut s = state(4, 4);
        assert!(s.set_input_label(0, "Input 1").is_none());
        assert!(s.set_route(1, 1).is_none());
        assert!(!s.set_lock(0, false));
    }

    #[test]
    fn test_effective_writes_return_old_value() {
        let mut s = state(4, 4);
        assert_eq!(s.set_input_label(0, "Camera 1"), Some("Input 1".to_string()));
        assert_eq!(s.input_label(0), Some("Camera 1"));
        assert_eq!(s.set_route(0, 3), Some(0));
        assert_eq!(s.route(0), Some(3));
        assert!(s.set_lock(2, true));
        assert_eq!(s.lock(2), Some(true));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut s = state(2, 2);
        assert!(s.set_input_label(2, "x").is_none());
        assert!(s.set_route(2, 0).is_none());
        assert!(!s.set_lock(5, true));
    }

    #[test]
    fn test_friendly_name_change() {
        let mut s = state(2, 2);
        let old = s.set_friendly_name("Studio Router");
        assert_eq!(old, Some("Blackmagic Smart Videohub".to_string()));
        assert!(s.set_friendly_name("Studio Router").is_none());
    }

    #[test]
    fn test_pending_clear() {
        let mut p = PendingChanges::default();
        assert!(p.is_empty());
        p.routing.insert(3);
        p.locks.insert(1);
        assert!(!p.is_empty());
        p.clear();
        assert!(p.is_empty());
    }
}
