//! Command dispatcher - classify and apply one framed message
//!
//! Each message is independent: the header selects the command, body lines
//! carry per-index values. Validation is strict validate-then-apply: every
//! body line is parsed and range-checked (and routing lines offered to the
//! Routing Authority) before any mutation commits, so a rejected message
//! commits nothing.

use tracing::{debug, warn};

use super::{
    FRIENDLY_NAME_LABEL, HEADER_DEVICE, HEADER_INPUT_LABELS, HEADER_LOCKS, HEADER_OUTPUT_LABELS,
    HEADER_PING, HEADER_ROUTING,
};
use crate::events::{HubEvent, LabelKind};
use crate::routing::RoutingAuthority;
use crate::state::{HubState, PendingChanges};

/// Classification of one processed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Applied (or nothing to do); reply ACK
    Ok,
    /// Rejected; reply NAK, nothing committed
    Error,
    /// Recognized header with empty body: send the full dump back
    InputDump,
    OutputDump,
    RoutingDump,
    LockDump,
}

/// Process one framed message against the store
///
/// Returns the status plus the events for every mutation that committed,
/// in commit order. Pending sets are updated for effective changes only.
pub fn process_message(
    message: &[String],
    state: &mut HubState,
    pending: &mut PendingChanges,
    authority: &dyn RoutingAuthority,
) -> (ProcessStatus, Vec<HubEvent>) {
    let Some(header) = message.first() else {
        return (ProcessStatus::Error, Vec::new());
    };
    let body = &message[1..];

    if header.starts_with(HEADER_PING) {
        (ProcessStatus::Ok, Vec::new())
    } else if header.starts_with(HEADER_DEVICE) {
        process_device(body, state)
    } else if header.starts_with(HEADER_INPUT_LABELS) {
        process_labels(body, state, pending, LabelKind::Input)
    } else if header.starts_with(HEADER_OUTPUT_LABELS) {
        process_labels(body, state, pending, LabelKind::Output)
    } else if header.starts_with(HEADER_ROUTING) {
        process_routing(body, state, pending, authority)
    } else if header.starts_with(HEADER_LOCKS) {
        process_locks(body, state, pending)
    } else {
        warn!(header = header.as_str(), "Unrecognized command header");
        (ProcessStatus::Error, Vec::new())
    }
}

/// `VIDEOHUB DEVICE:` body - only the friendly-name line mutates
fn process_device(body: &[String], state: &mut HubState) -> (ProcessStatus, Vec<HubEvent>) {
    let mut events = Vec::new();

    for line in body {
        let Some(colon) = line.find(':') else {
            continue;
        };
        let label = &line[..=colon];
        let value = line[colon + 1..].trim();

        if label == FRIENDLY_NAME_LABEL {
            if let Some(old) = state.set_friendly_name(value) {
                debug!(name = value, "Friendly name changed");
                events.push(HubEvent::NameChanged {
                    new: value.to_string(),
                    old,
                });
            }
        }
    }

    (ProcessStatus::Ok, events)
}

/// `INPUT LABELS:` / `OUTPUT LABELS:` body
fn process_labels(
    body: &[String],
    state: &mut HubState,
    pending: &mut PendingChanges,
    kind: LabelKind,
) -> (ProcessStatus, Vec<HubEvent>) {
    if body.is_empty() {
        let dump = match kind {
            LabelKind::Input => ProcessStatus::InputDump,
            LabelKind::Output => ProcessStatus::OutputDump,
        };
        return (dump, Vec::new());
    }

    let count = match kind {
        LabelKind::Input => state.input_count(),
        LabelKind::Output => state.output_count(),
    };

    // Validate every line before committing anything.
    let mut parsed = Vec::with_capacity(body.len());
    for line in body {
        let (index, text) = split_body_line(line);
        if index >= count {
            warn!(index, count, "Label index out of range");
            return (ProcessStatus::Error, Vec::new());
        }
        parsed.push((index, text));
    }

    let mut events = Vec::new();
    for (index, text) in parsed {
        let changed = match kind {
            LabelKind::Input => state.set_input_label(index, text),
            LabelKind::Output => state.set_output_label(index, text),
        };
        if let Some(old) = changed {
            match kind {
                LabelKind::Input => pending.input_labels.insert(index),
                LabelKind::Output => pending.output_labels.insert(index),
            };
            events.push(HubEvent::LabelChanged {
                kind,
                index,
                new: text.to_string(),
                old,
            });
        }
    }

    (ProcessStatus::Ok, events)
}

/// `VIDEO OUTPUT ROUTING:` body
fn process_routing(
    body: &[String],
    state: &mut HubState,
    pending: &mut PendingChanges,
    authority: &dyn RoutingAuthority,
) -> (ProcessStatus, Vec<HubEvent>) {
    if body.is_empty() {
        return (ProcessStatus::RoutingDump, Vec::new());
    }

    let mut parsed = Vec::with_capacity(body.len());
    for line in body {
        let (output, rest) = split_body_line(line);
        let input = parse_leading_int(rest);
        if output >= state.output_count() || input >= state.input_count() {
            warn!(output, input, "Routing index out of range");
            return (ProcessStatus::Error, Vec::new());
        }
        if !authority.attempt(output, input) {
            debug!(output, input, "Routing change vetoed by authority");
            return (ProcessStatus::Error, Vec::new());
        }
        parsed.push((output, input));
    }

    let mut events = Vec::new();
    for (output, input) in parsed {
        if let Some(old_input) = state.set_route(output, input) {
            pending.routing.insert(output);
            events.push(HubEvent::RoutingChanged {
                output,
                new_input: input,
                old_input,
            });
        }
    }

    (ProcessStatus::Ok, events)
}

/// `VIDEO OUTPUT LOCKS:` body
///
/// Token `U` unlocks; `O`, `L`, and `F` lock. Requests that match the
/// current state are no-ops and never mark the index pending. Unknown
/// tokens are ignored, matching device behavior.
fn process_locks(
    body: &[String],
    state: &mut HubState,
    pending: &mut PendingChanges,
) -> (ProcessStatus, Vec<HubEvent>) {
    if body.is_empty() {
        return (ProcessStatus::LockDump, Vec::new());
    }

    let mut parsed = Vec::with_capacity(body.len());
    for line in body {
        let (output, token) = split_body_line(line);
        if output >= state.output_count() {
            warn!(output, "Lock index out of range");
            return (ProcessStatus::Error, Vec::new());
        }
        let desired = match token {
            "U" => Some(false),
            "O" | "L" | "F" => Some(true),
            _ => None,
        };
        parsed.push((output, desired));
    }

    let mut events = Vec::new();
    for (output, desired) in parsed {
        let Some(locked) = desired else { continue };
        if state.set_lock(output, locked) {
            pending.locks.insert(output);
            events.push(HubEvent::LockChanged { output, locked });
        }
    }

    (ProcessStatus::Ok, events)
}

/// Parse leading ASCII digits; empty prefix parses as 0, overflow as
/// an out-of-range sentinel so the range check rejects it
fn parse_leading_int(s: &str) -> usize {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return 0;
    }
    s[..end].parse().unwrap_or(usize::MAX)
}

/// Split a body line on the first space: left is the index, right the
/// trimmed value/text/token
fn split_body_line(line: &str) -> (usize, &str) {
    match line.split_once(' ') {
        Some((left, right)) => (parse_leading_int(left), right.trim()),
        None => (parse_leading_int(line), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceIdentity, DeviceType};
    use crate::routing::AcceptAll;

    struct RejectAll;
    impl RoutingAuthority for RejectAll {
        fn attempt(&self, _output: usize, _input: usize) -> bool {
            false
        }
    }

    fn fixture(inputs: usize, outputs: usize) -> (HubState, PendingChanges) {
        let identity = DeviceIdentity::new(DeviceType::MicroVideohub, None);
        (HubState::new(identity, inputs, outputs), PendingChanges::default())
    }

    fn msg(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn run(
        lines: &[&str],
        state: &mut HubState,
        pending: &mut PendingChanges,
    ) -> (ProcessStatus, Vec<HubEvent>) {
        process_message(&msg(lines), state, pending, &AcceptAll)
    }

    #[test]
    fn test_ping() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(&["PING:"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
    }

    #[test]
    fn test_unrecognized_header_is_error() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, _) = run(&["VIDEO INPUT STATUS:"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Error);
    }

    #[test]
    fn test_empty_body_yields_dump() {
        let (mut s, mut p) = fixture(2, 2);
        assert_eq!(run(&["INPUT LABELS:"], &mut s, &mut p).0, ProcessStatus::InputDump);
        assert_eq!(run(&["OUTPUT LABELS:"], &mut s, &mut p).0, ProcessStatus::OutputDump);
        assert_eq!(
            run(&["VIDEO OUTPUT ROUTING:"], &mut s, &mut p).0,
            ProcessStatus::RoutingDump
        );
        assert_eq!(run(&["VIDEO OUTPUT LOCKS:"], &mut s, &mut p).0, ProcessStatus::LockDump);
        assert!(p.is_empty());
    }

    #[test]
    fn test_label_change_marks_pending() {
        let (mut s, mut p) = fixture(4, 4);
        let (status, events) = run(&["INPUT LABELS:", "2 Camera 3"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert_eq!(s.input_label(2), Some("Camera 3"));
        assert!(p.input_labels.contains(&2));
        assert_eq!(
            events,
            vec![HubEvent::LabelChanged {
                kind: LabelKind::Input,
                index: 2,
                new: "Camera 3".to_string(),
                old: "Input 3".to_string(),
            }]
        );
    }

    #[test]
    fn test_noop_label_not_pending() {
        let (mut s, mut p) = fixture(4, 4);
        let (status, events) = run(&["INPUT LABELS:", "0 Input 1"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
        assert!(p.is_empty());
    }

    #[test]
    fn test_routing_change() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(&["VIDEO OUTPUT ROUTING:", "0 1"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert_eq!(s.route(0), Some(1));
        assert_eq!(s.route(1), Some(1));
        assert!(p.routing.contains(&0));
        assert!(!p.routing.contains(&1));
        assert_eq!(
            events,
            vec![HubEvent::RoutingChanged {
                output: 0,
                new_input: 1,
                old_input: 0,
            }]
        );
    }

    #[test]
    fn test_routing_out_of_range_rejects_whole_message() {
        let (mut s, mut p) = fixture(2, 2);
        // First line is valid, second is out of range: nothing commits.
        let (status, events) =
            run(&["VIDEO OUTPUT ROUTING:", "0 1", "2 0"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Error);
        assert!(events.is_empty());
        assert_eq!(s.route(0), Some(0));
        assert!(p.is_empty());
    }

    #[test]
    fn test_routing_input_out_of_range() {
        let (mut s, mut p) = fixture(2, 4);
        let (status, _) = run(&["VIDEO OUTPUT ROUTING:", "3 2"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Error);
    }

    #[test]
    fn test_routing_veto_rejects_and_commits_nothing() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) =
            process_message(&msg(&["VIDEO OUTPUT ROUTING:", "0 1"]), &mut s, &mut p, &RejectAll);
        assert_eq!(status, ProcessStatus::Error);
        assert!(events.is_empty());
        assert_eq!(s.route(0), Some(0));
        assert!(p.is_empty());
    }

    #[test]
    fn test_lock_tokens() {
        let (mut s, mut p) = fixture(2, 2);
        for token in ["O", "L", "F"] {
            let line = format!("0 {token}");
            let (status, _) = run(&["VIDEO OUTPUT LOCKS:", &line], &mut s, &mut p);
            assert_eq!(status, ProcessStatus::Ok);
            assert_eq!(s.lock(0), Some(true));
        }
        // Only the first application was an effective transition.
        assert!(p.locks.contains(&0));
        p.clear();

        let (status, events) = run(&["VIDEO OUTPUT LOCKS:", "0 O"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
        assert!(p.is_empty());

        let (_, events) = run(&["VIDEO OUTPUT LOCKS:", "0 U"], &mut s, &mut p);
        assert_eq!(s.lock(0), Some(false));
        assert_eq!(events, vec![HubEvent::LockChanged { output: 0, locked: false }]);
    }

    #[test]
    fn test_unlock_when_unlocked_is_noop() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(&["VIDEO OUTPUT LOCKS:", "1 U"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
        assert!(p.is_empty());
    }

    #[test]
    fn test_unknown_lock_token_ignored() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(&["VIDEO OUTPUT LOCKS:", "0 X"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
        assert_eq!(s.lock(0), Some(false));
    }

    #[test]
    fn test_friendly_name_update() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(
            &["VIDEOHUB DEVICE:", "Friendly name: Studio Router"],
            &mut s,
            &mut p,
        );
        assert_eq!(status, ProcessStatus::Ok);
        assert_eq!(s.identity().friendly_name, "Studio Router");
        assert!(matches!(events.as_slice(), [HubEvent::NameChanged { .. }]));
        // Identity changes do not use the four pending sets.
        assert!(p.is_empty());
    }

    #[test]
    fn test_device_lines_other_than_friendly_name_ignored() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, events) = run(
            &["VIDEOHUB DEVICE:", "Model name: Rogue Rename"],
            &mut s,
            &mut p,
        );
        assert_eq!(status, ProcessStatus::Ok);
        assert!(events.is_empty());
        assert_eq!(s.identity().model_name, "Blackmagic Micro Videohub");
    }

    #[test]
    fn test_device_empty_body_is_ok_not_dump() {
        let (mut s, mut p) = fixture(2, 2);
        let (status, _) = run(&["VIDEOHUB DEVICE:"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("12"), 12);
        assert_eq!(parse_leading_int("7abc"), 7);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), usize::MAX);
    }

    #[test]
    fn test_digitless_index_parses_as_zero() {
        let (mut s, mut p) = fixture(4, 4);
        // "x 1" parses as index 0, which is in range: output 0 -> input 1.
        let (status, _) = run(&["VIDEO OUTPUT ROUTING:", "x 1"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert_eq!(s.route(0), Some(1));
    }

    #[test]
    fn test_duplicate_index_last_line_wins() {
        let (mut s, mut p) = fixture(4, 4);
        let (status, _) = run(&["VIDEO OUTPUT ROUTING:", "0 1", "0 2"], &mut s, &mut p);
        assert_eq!(status, ProcessStatus::Ok);
        assert_eq!(s.route(0), Some(2));
        assert_eq!(p.routing.len(), 1);
    }
}
