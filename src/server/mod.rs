//! Engine actor - connection registry, dispatch, broadcast
//!
//! One actor task owns the state store, the pending-change sets, the client
//! registry, the routing authority, and the discovery publisher. All
//! mutation and fan-out runs on this task, so message handling for one
//! connection completes (framing, dispatch, reply, broadcast) before the
//! next command is serviced - the single-threaded model the protocol
//! requires.
//!
//! Per client there are two I/O tasks: a reader that forwards raw chunks
//! into the actor, and a writer draining a channel into the socket. Writes
//! are fire-and-forget; a slow or dead client never blocks the actor.

mod commands;
mod handle;

pub use commands::{ClientId, EngineCommand};
pub use handle::VideoHubHandle;

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::device::{self, DeviceIdentity, DeviceType};
use crate::discovery::{DiscoveryPublisher, LogPublisher, ServiceRecord};
use crate::events::{EventFn, HubEvent};
use crate::protocol::{self, render, MessageFramer, ProcessStatus};
use crate::routing::{AcceptAll, RoutingAuthority};
use crate::state::{HubState, PendingChanges};

/// Errors surfaced when starting the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// Server construction parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub device_type: DeviceType,
    pub input_count: usize,
    pub output_count: usize,
    /// Bind address; port 0 selects an ephemeral port
    pub bind: String,
    pub port: u16,
    /// Overrides the model-name default
    pub friendly_name: Option<String>,
    /// MAC-like token for the unique id; looked up from the host when None
    pub host_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::VideohubServer,
            input_count: 40,
            output_count: 40,
            bind: "0.0.0.0".to_string(),
            port: protocol::DEFAULT_PORT,
            friendly_name: None,
            host_id: None,
        }
    }
}

/// One registered client connection
struct Client {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Bytes>,
    framer: MessageFramer,
}

/// The engine actor
pub struct VideoHubServer {
    state: HubState,
    pending: PendingChanges,
    clients: HashMap<ClientId, Client>,
    authority: Box<dyn RoutingAuthority>,
    publisher: Box<dyn DiscoveryPublisher>,
    subscribers: Vec<EventFn>,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    port: u16,
}

impl VideoHubServer {
    /// Start with the default routing authority and discovery publisher
    pub async fn start(config: ServerConfig) -> Result<VideoHubHandle, ServerError> {
        Self::start_with(
            config,
            Box::new(AcceptAll),
            Box::new(LogPublisher::default()),
        )
        .await
    }

    /// Bind, publish the discovery record, and spawn the engine
    ///
    /// The returned handle is the only way to interact with the engine;
    /// dropping every handle shuts it down.
    pub async fn start_with(
        config: ServerConfig,
        authority: Box<dyn RoutingAuthority>,
        mut publisher: Box<dyn DiscoveryPublisher>,
    ) -> Result<VideoHubHandle, ServerError> {
        let bind_addr = format!("{}:{}", config.bind, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: bind_addr,
            source,
        })?;

        let host_id = config.host_id.clone().or_else(device::lookup_host_id);
        let mut identity = DeviceIdentity::new(config.device_type, host_id);
        if let Some(name) = &config.friendly_name {
            identity.friendly_name = name.clone();
        }
        let state = HubState::new(identity, config.input_count, config.output_count);

        publisher.start_publish(&ServiceRecord::new(
            &state.identity().friendly_name,
            &state.identity().unique_id,
            local_addr.port(),
        ));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = VideoHubServer {
            state,
            pending: PendingChanges::default(),
            clients: HashMap::new(),
            authority,
            publisher,
            subscribers: Vec::new(),
            command_rx: cmd_rx,
            port: local_addr.port(),
        };
        tokio::spawn(actor.run());
        tokio::spawn(accept_loop(listener, cmd_tx.clone()));

        info!(%local_addr, "Videohub server started");

        Ok(VideoHubHandle::new(cmd_tx, local_addr))
    }

    /// Main run loop: commands are processed strictly sequentially
    async fn run(mut self) {
        debug!("Engine run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                EngineCommand::ClientConnected { id, addr, tx } => {
                    self.handle_client_connected(id, addr, tx);
                }
                EngineCommand::ClientData { id, chunk } => {
                    self.handle_client_data(id, &chunk);
                }
                EngineCommand::ClientClosed { id } => {
                    if let Some(client) = self.clients.remove(&id) {
                        debug!(id, addr = %client.addr, "Client disconnected");
                    }
                }
                EngineCommand::SetRoute { output, input } => {
                    if input < self.state.input_count() {
                        if let Some(old_input) = self.state.set_route(output, input) {
                            self.pending.routing.insert(output);
                            self.notify(&[HubEvent::RoutingChanged {
                                output,
                                new_input: input,
                                old_input,
                            }]);
                            self.flush_pending();
                        }
                    }
                }
                EngineCommand::SetInputLabel { index, label } => {
                    if let Some(old) = self.state.set_input_label(index, &label) {
                        self.pending.input_labels.insert(index);
                        self.notify(&[HubEvent::LabelChanged {
                            kind: crate::events::LabelKind::Input,
                            index,
                            new: label,
                            old,
                        }]);
                        self.flush_pending();
                    }
                }
                EngineCommand::SetOutputLabel { index, label } => {
                    if let Some(old) = self.state.set_output_label(index, &label) {
                        self.pending.output_labels.insert(index);
                        self.notify(&[HubEvent::LabelChanged {
                            kind: crate::events::LabelKind::Output,
                            index,
                            new: label,
                            old,
                        }]);
                        self.flush_pending();
                    }
                }
                EngineCommand::SetLock { output, locked } => {
                    if self.state.set_lock(output, locked) {
                        self.pending.locks.insert(output);
                        self.notify(&[HubEvent::LockChanged { output, locked }]);
                        self.flush_pending();
                    }
                }
                EngineCommand::SetFriendlyName { name } => {
                    if let Some(old) = self.state.set_friendly_name(&name) {
                        self.notify(&[HubEvent::NameChanged { new: name, old }]);
                        self.republish();
                    }
                }
                EngineCommand::Republish => self.republish(),
                EngineCommand::Subscribe { listener, response } => {
                    self.subscribers.push(listener);
                    let _ = response.send(self.subscribers.len() - 1);
                }
                EngineCommand::GetRoute { output, response } => {
                    let _ = response.send(self.state.route(output));
                }
                EngineCommand::GetInputLabel { index, response } => {
                    let _ = response.send(self.state.input_label(index).map(str::to_string));
                }
                EngineCommand::GetOutputLabel { index, response } => {
                    let _ = response.send(self.state.output_label(index).map(str::to_string));
                }
                EngineCommand::GetLock { output, response } => {
                    let _ = response.send(self.state.lock(output));
                }
                EngineCommand::GetIdentity { response } => {
                    let _ = response.send(self.state.identity().clone());
                }
                EngineCommand::ClientCount { response } => {
                    let _ = response.send(self.clients.len());
                }
                EngineCommand::Shutdown => {
                    info!("Engine received shutdown command");
                    self.publisher.stop_publish();
                    break;
                }
            }
        }

        debug!("Engine run loop terminated");
    }

    /// Register a client and send the connection-establishment sequence:
    /// preamble, device block, then full dumps of all four categories
    fn handle_client_connected(
        &mut self,
        id: ClientId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<Bytes>,
    ) {
        debug!(id, %addr, "Client connected");

        let mut welcome = String::new();
        welcome.push_str(&render::preamble(&self.state));
        welcome.push_str(&render::device_info(&self.state));
        welcome.push_str(&render::input_labels(&self.state, 0..self.state.input_count()));
        welcome.push_str(&render::output_labels(&self.state, 0..self.state.output_count()));
        welcome.push_str(&render::routing(&self.state, 0..self.state.output_count()));
        welcome.push_str(&render::locks(&self.state, 0..self.state.output_count()));

        let client = Client {
            addr,
            tx,
            framer: MessageFramer::new(),
        };
        send_text(&client, &welcome);
        self.clients.insert(id, client);
    }

    /// Process one read's worth of bytes from one client
    ///
    /// Each completed message gets exactly one immediate reply (NAK, or
    /// ACK plus the full dump a dump request implies). After the whole
    /// batch, every non-empty pending category is broadcast to all clients
    /// and the pending sets are cleared.
    fn handle_client_data(&mut self, id: ClientId, chunk: &[u8]) {
        trace!(id, len = chunk.len(), "Client data");

        let Some(client) = self.clients.get_mut(&id) else {
            // Data raced with disconnect; nothing to do.
            return;
        };
        let messages = client.framer.push(chunk);

        for message in messages {
            let (status, events) = protocol::process_message(
                &message,
                &mut self.state,
                &mut self.pending,
                self.authority.as_ref(),
            );

            let republish = events
                .iter()
                .any(|e| matches!(e, HubEvent::NameChanged { .. }));
            self.notify(&events);
            if republish {
                self.republish();
            }

            let mut reply = String::new();
            match status {
                ProcessStatus::Error => reply.push_str(protocol::NAK),
                other => {
                    reply.push_str(protocol::ACK);
                    match other {
                        ProcessStatus::InputDump => reply
                            .push_str(&render::input_labels(&self.state, 0..self.state.input_count())),
                        ProcessStatus::OutputDump => reply.push_str(&render::output_labels(
                            &self.state,
                            0..self.state.output_count(),
                        )),
                        ProcessStatus::RoutingDump => reply
                            .push_str(&render::routing(&self.state, 0..self.state.output_count())),
                        ProcessStatus::LockDump => reply
                            .push_str(&render::locks(&self.state, 0..self.state.output_count())),
                        _ => {}
                    }
                }
            }

            if let Some(client) = self.clients.get(&id) {
                send_text(client, &reply);
            }
        }

        self.flush_pending();
    }

    /// Broadcast one incremental dump per changed category to every
    /// connected client, then clear all pending sets unconditionally
    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let mut update = String::new();
            if !self.pending.input_labels.is_empty() {
                update.push_str(&render::input_labels(
                    &self.state,
                    self.pending.input_labels.iter().copied(),
                ));
            }
            if !self.pending.output_labels.is_empty() {
                update.push_str(&render::output_labels(
                    &self.state,
                    self.pending.output_labels.iter().copied(),
                ));
            }
            if !self.pending.routing.is_empty() {
                update.push_str(&render::routing(
                    &self.state,
                    self.pending.routing.iter().copied(),
                ));
            }
            if !self.pending.locks.is_empty() {
                update.push_str(&render::locks(
                    &self.state,
                    self.pending.locks.iter().copied(),
                ));
            }

            trace!(clients = self.clients.len(), "Broadcasting incremental update");
            for client in self.clients.values() {
                send_text(client, &update);
            }
        }

        self.pending.clear();
    }

    /// Invoke every subscriber for every committed change, in commit order
    fn notify(&self, events: &[HubEvent]) {
        for event in events {
            for subscriber in &self.subscribers {
                subscriber(event);
            }
        }
    }

    /// Withdraw the discovery record and publish it with the current name
    fn republish(&mut self) {
        self.publisher.stop_publish();
        self.publisher.start_publish(&ServiceRecord::new(
            &self.state.identity().friendly_name,
            &self.state.identity().unique_id,
            self.port,
        ));
    }
}

/// Queue text for a client's writer task, encoded as Latin-1 wire bytes
/// (fire-and-forget)
fn send_text(client: &Client, text: &str) {
    if !text.is_empty() {
        let _ = client.tx.send(Bytes::from(protocol::encode_latin1(text)));
    }
}

/// Accept connections until the engine goes away
async fn accept_loop(listener: TcpListener, cmd_tx: mpsc::UnboundedSender<EngineCommand>) {
    let mut next_id: ClientId = 0;

    loop {
        tokio::select! {
            _ = cmd_tx.closed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        next_id += 1;
                        spawn_client_tasks(next_id, stream, addr, cmd_tx.clone());
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                    }
                }
            }
        }
    }

    debug!("Accept loop terminated");
}

/// Register a client with the engine and spawn its reader/writer tasks
///
/// ClientConnected is sent before the reader exists, so the engine always
/// sees the registration before any of the client's data.
fn spawn_client_tasks(
    id: ClientId,
    stream: TcpStream,
    addr: SocketAddr,
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Bytes>();

    if cmd_tx
        .send(EngineCommand::ClientConnected {
            id,
            addr,
            tx: write_tx,
        })
        .is_err()
    {
        return;
    }

    // Writer: drain queued blocks into the socket until either end closes.
    tokio::spawn(async move {
        while let Some(bytes) = write_rx.recv().await {
            if write_half.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    // Reader: forward raw chunks; EOF or error means disconnect.
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if cmd_tx.send(EngineCommand::ClientData { id, chunk }).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = cmd_tx.send(EngineCommand::ClientClosed { id });
    });
}
