//! Wire block renderers
//!
//! Every outbound block is `HEADER:` + one line per entry + a blank line.
//! Full dumps enumerate all indices for a category; incremental dumps take
//! the pending index set and list only what changed.

use std::fmt::Write;

use crate::state::HubState;

/// Assemble one block: header, lines, trailing blank line
fn block<I: IntoIterator<Item = String>>(header: &str, lines: I) -> String {
    let mut out = String::with_capacity(64);
    out.push_str(header);
    out.push_str(":\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// `PROTOCOL PREAMBLE` - the version banner sent first on connect
pub fn preamble(state: &HubState) -> String {
    block(
        "PROTOCOL PREAMBLE",
        [format!("Version: {}", state.identity().version)],
    )
}

/// `VIDEOHUB DEVICE` - the device information block
///
/// Monitoring outputs, processing units, and serial ports are fixed at 0
/// for this emulation.
pub fn device_info(state: &HubState) -> String {
    let identity = state.identity();
    let mut lines = Vec::with_capacity(9);
    lines.push("Device present: true".to_string());
    lines.push(format!("Model name: {}", identity.model_name));
    lines.push(format!("Friendly name: {}", identity.friendly_name));
    lines.push(format!("Unique ID: {}", identity.unique_id));
    lines.push(format!("Video inputs: {}", state.input_count()));
    lines.push("Video processing units: 0".to_string());
    lines.push(format!("Video outputs: {}", state.output_count()));
    lines.push("Video monitoring outputs: 0".to_string());
    lines.push("Serial ports: 0".to_string());
    block("VIDEOHUB DEVICE", lines)
}

/// `INPUT LABELS` block for the given indices
pub fn input_labels<I: IntoIterator<Item = usize>>(state: &HubState, indices: I) -> String {
    block(
        "INPUT LABELS",
        indices.into_iter().map(|i| {
            let mut line = String::new();
            let _ = write!(line, "{} {}", i, state.input_label(i).unwrap_or_default());
            line
        }),
    )
}

/// `OUTPUT LABELS` block for the given indices
pub fn output_labels<I: IntoIterator<Item = usize>>(state: &HubState, indices: I) -> String {
    block(
        "OUTPUT LABELS",
        indices.into_iter().map(|i| {
            let mut line = String::new();
            let _ = write!(line, "{} {}", i, state.output_label(i).unwrap_or_default());
            line
        }),
    )
}

/// `VIDEO OUTPUT ROUTING` block: `<output> <input>` per line
pub fn routing<I: IntoIterator<Item = usize>>(state: &HubState, indices: I) -> String {
    block(
        "VIDEO OUTPUT ROUTING",
        indices
            .into_iter()
            .map(|o| format!("{} {}", o, state.route(o).unwrap_or_default())),
    )
}

/// `VIDEO OUTPUT LOCKS` block: `<output> L|U` per line
pub fn locks<I: IntoIterator<Item = usize>>(state: &HubState, indices: I) -> String {
    block(
        "VIDEO OUTPUT LOCKS",
        indices.into_iter().map(|o| {
            format!(
                "{} {}",
                o,
                if state.lock(o).unwrap_or(false) { "L" } else { "U" }
            )
        }),
    )
}
