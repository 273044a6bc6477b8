//! Command enum for the engine actor
//!
//! Commands are divided into two categories:
//! - **Fire-and-forget**: connection lifecycle, inbound bytes, host-side
//!   mutations. The sender does not wait for acknowledgment.
//! - **Request-response**: queries that return data via oneshot channel.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::device::DeviceIdentity;
use crate::events::EventFn;

/// Identifies one live client connection
pub type ClientId = u64;

/// Commands processed sequentially by the engine actor
pub enum EngineCommand {
    // -------------------------------------------------------------------------
    // Connection lifecycle (fire-and-forget)
    // -------------------------------------------------------------------------
    /// A client connected; `tx` feeds its writer task
    ClientConnected {
        id: ClientId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<Bytes>,
    },

    /// One read's worth of bytes from a client
    ClientData { id: ClientId, chunk: Bytes },

    /// A client disconnected; any partial frame is discarded
    ClientClosed { id: ClientId },

    // -------------------------------------------------------------------------
    // Host-side mutations (fire-and-forget)
    // -------------------------------------------------------------------------
    /// Route an output to an input
    SetRoute { output: usize, input: usize },

    /// Set an input label
    SetInputLabel { index: usize, label: String },

    /// Set an output label
    SetOutputLabel { index: usize, label: String },

    /// Lock or unlock an output
    SetLock { output: usize, locked: bool },

    /// Change the friendly name (triggers re-advertisement)
    SetFriendlyName { name: String },

    /// Withdraw and re-publish the discovery record
    Republish,

    /// Stop the engine: withdraw the record, drop all clients
    Shutdown,

    // -------------------------------------------------------------------------
    // Request-response (require oneshot channel)
    // -------------------------------------------------------------------------
    /// Register a change-notification subscriber; responds with its id
    Subscribe {
        listener: EventFn,
        response: oneshot::Sender<usize>,
    },

    /// Current source input of an output
    GetRoute {
        output: usize,
        response: oneshot::Sender<Option<usize>>,
    },

    GetInputLabel {
        index: usize,
        response: oneshot::Sender<Option<String>>,
    },

    GetOutputLabel {
        index: usize,
        response: oneshot::Sender<Option<String>>,
    },

    GetLock {
        output: usize,
        response: oneshot::Sender<Option<bool>>,
    },

    /// Snapshot of the device identity
    GetIdentity {
        response: oneshot::Sender<DeviceIdentity>,
    },

    /// Number of currently connected clients
    ClientCount { response: oneshot::Sender<usize> },
}
