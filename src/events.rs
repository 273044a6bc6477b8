//! Change-notification events for the hosting application
//!
//! Every committed mutation produces one event, delivered synchronously to
//! registered subscribers after the commit and before the broadcast fan-out.

use std::sync::Arc;

/// Which label mapping an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Input,
    Output,
}

/// A committed state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// Friendly name changed (also triggers re-advertisement)
    NameChanged { new: String, old: String },
    /// A crosspoint was re-routed
    RoutingChanged {
        output: usize,
        new_input: usize,
        old_input: usize,
    },
    /// An input or output label changed
    LabelChanged {
        kind: LabelKind,
        index: usize,
        new: String,
        old: String,
    },
    /// An output lock was taken or released
    LockChanged { output: usize, locked: bool },
}

/// Subscriber callback invoked for each committed change
///
/// Must be Send + Sync; the engine actor calls it from its own task.
pub type EventFn = Arc<dyn Fn(&HubEvent) + Send + Sync>;
