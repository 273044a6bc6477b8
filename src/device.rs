//! Device identity - model table, friendly name, unique id
//!
//! A Videohub identifies itself to clients through a fixed model name
//! (selected by device type at construction), a mutable friendly name, and
//! a unique id derived once from the host's hardware address.

use clap::ValueEnum;
use tracing::debug;

/// Protocol version string advertised in the preamble (fixed per build)
pub const PROTOCOL_VERSION: &str = "2.3";

/// Fallback host identifier used when no hardware address can be found
pub const FALLBACK_HOST_ID: &str = "00:00:00:00:00:00";

/// Device type selector
///
/// Each variant maps to a fixed model-name string. The selector only
/// affects identity; matrix geometry is configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceType {
    VideohubServer,
    LocalUsbVideohub,
    Videohub,
    WorkgroupVideohub,
    BroadcastVideohub,
    StudioVideohub,
    EnterpriseVideohub,
    MicroVideohub,
    SmartVideohub,
    CompactVideohub,
    UniversalVideohub,
    UniversalVideohub72,
    UniversalVideohub288,
    SmartVideohub12x12,
    SmartVideohub20x20,
    SmartVideohub40x40,
    MultiView16,
    MultiView4,
}

impl DeviceType {
    /// Fixed model name for this device type
    pub fn model_name(&self) -> &'static str {
        match self {
            DeviceType::VideohubServer => "Blackmagic Videohub Server",
            DeviceType::LocalUsbVideohub => "Blackmagic Local USB Videohub",
            DeviceType::Videohub => "Blackmagic Videohub",
            DeviceType::WorkgroupVideohub => "Blackmagic Workgroup Videohub",
            DeviceType::BroadcastVideohub => "Blackmagic Broadcast Videohub",
            DeviceType::StudioVideohub => "Blackmagic Studio Videohub",
            DeviceType::EnterpriseVideohub => "Blackmagic Enterprise Videohub",
            DeviceType::MicroVideohub => "Blackmagic Micro Videohub",
            DeviceType::SmartVideohub => "Blackmagic Smart Videohub",
            DeviceType::CompactVideohub => "Blackmagic Compact Videohub",
            DeviceType::UniversalVideohub => "Blackmagic Universal Videohub",
            DeviceType::UniversalVideohub72 => "Blackmagic Universal Videohub 72",
            DeviceType::UniversalVideohub288 => "Blackmagic Universal Videohub 288",
            DeviceType::SmartVideohub12x12 => "Blackmagic Smart Videohub 12 x 12",
            DeviceType::SmartVideohub20x20 => "Blackmagic Smart Videohub 20 x 20",
            DeviceType::SmartVideohub40x40 => "Blackmagic Smart Videohub 40 x 40",
            DeviceType::MultiView16 => "Blackmagic MultiView 16",
            DeviceType::MultiView4 => "Blackmagic MultiView 4",
        }
    }
}

/// Device identity block
///
/// Model name and protocol version are fixed at construction; the friendly
/// name is mutable at any time (and triggers re-advertisement, handled by
/// the engine); the unique id is computed exactly once at startup.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub model_name: String,
    pub friendly_name: String,
    pub unique_id: String,
    pub version: String,
}

impl DeviceIdentity {
    /// Build the identity for a device type
    ///
    /// The friendly name defaults to the model name until a client or the
    /// hosting application changes it.
    pub fn new(device_type: DeviceType, host_id: Option<String>) -> Self {
        let model = device_type.model_name().to_string();
        Self {
            friendly_name: model.clone(),
            model_name: model,
            unique_id: unique_id_from_host(host_id),
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Derive the unique id from a MAC-like host identifier token
///
/// Colons are stripped and the result is lower-cased. Falls back to
/// [`FALLBACK_HOST_ID`] when no token is available.
pub fn unique_id_from_host(host_id: Option<String>) -> String {
    let token = host_id.unwrap_or_else(|| {
        debug!("No host identifier available, using fallback");
        FALLBACK_HOST_ID.to_string()
    });
    token.replace(':', "").to_lowercase()
}

/// Look up a hardware address for this host
///
/// Thin platform wrapper: on Linux, the first non-loopback interface
/// address under /sys/class/net. Returns None elsewhere or on failure.
pub fn lookup_host_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/sys/class/net").ok()?;
        for entry in entries.flatten() {
            if entry.file_name() == "lo" {
                continue;
            }
            let addr_path = entry.path().join("address");
            if let Ok(addr) = std::fs::read_to_string(addr_path) {
                let addr = addr.trim();
                if !addr.is_empty() && addr != "00:00:00:00:00:00" {
                    return Some(addr.to_string());
                }
            }
        }
        None
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
