//! Videohub Emu - Blackmagic Videohub control-protocol emulator
//!
//! A TCP service speaking the Videohub text protocol: any number of control
//! clients can read and mutate the shared routing/label/lock state, and
//! every connected client is kept in sync through incremental broadcasts.
//!
//! This crate provides:
//! - The protocol engine ([`server::VideoHubServer`] / [`server::VideoHubHandle`])
//! - Message framing, dispatch, and block rendering ([`protocol`])
//! - The authoritative state store ([`state`])
//! - The crosspoint-change extension point ([`routing::RoutingAuthority`])
//! - Change-notification events ([`events`]) and the discovery boundary
//!   ([`discovery`])

pub mod device;
pub mod discovery;
pub mod events;
pub mod protocol;
pub mod routing;
pub mod server;
pub mod state;

pub use device::{DeviceIdentity, DeviceType, PROTOCOL_VERSION};
pub use events::{HubEvent, LabelKind};
pub use routing::{AcceptAll, RoutingAuthority};
pub use server::{ServerConfig, ServerError, VideoHubHandle, VideoHubServer};
