//! Service-discovery boundary
//!
//! Publishing the control port on the network is an external collaborator
//! concern; the engine only drives start/stop around it. The default
//! publisher records the advertisement in the log so the lifecycle is
//! observable without any mDNS stack.

use tracing::info;

/// Service type a Videohub advertises on the network
pub const SERVICE_TYPE: &str = "_blackmagic._tcp";

/// Default discovery domain
pub const SERVICE_DOMAIN: &str = "local";

/// One discovery advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Instance name, derived from the friendly name
    pub name: String,
    pub service_type: String,
    pub domain: String,
    pub port: u16,
    /// TXT records (key, value)
    pub txt: Vec<(String, String)>,
}

impl ServiceRecord {
    /// Build the advertisement for a device
    pub fn new(friendly_name: &str, unique_id: &str, port: u16) -> Self {
        Self {
            name: friendly_name.to_string(),
            service_type: SERVICE_TYPE.to_string(),
            domain: SERVICE_DOMAIN.to_string(),
            port,
            txt: vec![
                ("name".to_string(), friendly_name.to_string()),
                ("unique id".to_string(), unique_id.to_string()),
            ],
        }
    }
}

/// Publishes and withdraws the discovery record
///
/// Invoked at startup and again (stop, then start with the updated record)
/// whenever the friendly name changes.
pub trait DiscoveryPublisher: Send {
    fn start_publish(&mut self, record: &ServiceRecord);
    fn stop_publish(&mut self);
}

/// Default publisher: logs the advertisement lifecycle
#[derive(Debug, Default)]
pub struct LogPublisher {
    active: Option<ServiceRecord>,
}

impl DiscoveryPublisher for LogPublisher {
    fn start_publish(&mut self, record: &ServiceRecord) {
        info!(
            name = record.name.as_str(),
            service_type = record.service_type.as_str(),
            port = record.port,
            "Publishing discovery record"
        );
        self.active = Some(record.clone());
    }

    fn stop_publish(&mut self) {
        if let Some(record) = self.active.take() {
            info!(name = record.name.as_str(), "Withdrawing discovery record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_carries_identity() {
        let record = ServiceRecord::new("Studio Router", "aabbcc001122", 9990);
        assert_eq!(record.name, "Studio Router");
        assert_eq!(record.service_type, "_blackmagic._tcp");
        assert_eq!(record.domain, "local");
        assert_eq!(record.port, 9990);
        assert!(record
            .txt
            .iter()
            .any(|(k, v)| k == "unique id" && v == "aabbcc001122"));
    }
}
