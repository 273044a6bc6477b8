//! VideoHubHandle - public API for the engine actor
//!
//! Wraps the command channel in ergonomic methods: fire-and-forget for
//! mutations, async oneshot round-trips for queries. Cloning the handle is
//! cheap; the engine stops once every handle (and the accept loop) is gone
//! or `stop()` is called.

use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};

use super::commands::EngineCommand;
use crate::device::DeviceIdentity;
use crate::events::{EventFn, HubEvent};

/// Handle for interacting with a running Videohub server
#[derive(Clone)]
pub struct VideoHubHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    local_addr: SocketAddr,
}

impl VideoHubHandle {
    pub(super) fn new(cmd_tx: mpsc::UnboundedSender<EngineCommand>, local_addr: SocketAddr) -> Self {
        Self { cmd_tx, local_addr }
    }

    /// Address the server is listening on (resolves port 0 binds)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the engine: withdraws the discovery record and drops every
    /// client connection
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    /// Withdraw and re-publish the discovery record
    pub fn republish(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Republish);
    }

    // =========================================================================
    // Mutators (fire-and-forget; changes fan out to all clients)
    // =========================================================================

    /// Route an output to an input
    pub fn set_route(&self, output: usize, input: usize) {
        let _ = self.cmd_tx.send(EngineCommand::SetRoute { output, input });
    }

    pub fn set_input_label(&self, index: usize, label: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SetInputLabel {
            index,
            label: label.into(),
        });
    }

    pub fn set_output_label(&self, index: usize, label: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SetOutputLabel {
            index,
            label: label.into(),
        });
    }

    pub fn set_lock(&self, output: usize, locked: bool) {
        let _ = self.cmd_tx.send(EngineCommand::SetLock { output, locked });
    }

    /// Change the friendly name; triggers exactly one re-publish cycle
    pub fn set_friendly_name(&self, name: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SetFriendlyName { name: name.into() });
    }

    /// Register a change-notification callback
    ///
    /// Returns the subscriber id, or None if the engine is gone.
    pub async fn subscribe<F>(&self, listener: F) -> Option<usize>
    where
        F: Fn(&HubEvent) + Send + Sync + 'static,
    {
        let (response, rx) = oneshot::channel();
        let listener: EventFn = std::sync::Arc::new(listener);
        self.cmd_tx
            .send(EngineCommand::Subscribe { listener, response })
            .ok()?;
        rx.await.ok()
    }

    // =========================================================================
    // Queries (async with response)
    // =========================================================================

    pub async fn route(&self, output: usize) -> Option<usize> {
        self.query(|response| EngineCommand::GetRoute { output, response })
            .await
            .flatten()
    }

    pub async fn input_label(&self, index: usize) -> Option<String> {
        self.query(|response| EngineCommand::GetInputLabel { index, response })
            .await
            .flatten()
    }

    pub async fn output_label(&self, index: usize) -> Option<String> {
        self.query(|response| EngineCommand::GetOutputLabel { index, response })
            .await
            .flatten()
    }

    pub async fn lock(&self, output: usize) -> Option<bool> {
        self.query(|response| EngineCommand::GetLock { output, response })
            .await
            .flatten()
    }

    pub async fn identity(&self) -> Option<DeviceIdentity> {
        self.query(|response| EngineCommand::GetIdentity { response })
            .await
    }

    pub async fn client_count(&self) -> Option<usize> {
        self.query(|response| EngineCommand::ClientCount { response })
            .await
    }

    /// One oneshot round-trip to the engine
    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> EngineCommand) -> Option<T> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx.send(make(response)).ok()?;
        rx.await.ok()
    }
}
