//! Routing Authority - the crosspoint-change extension point
//!
//! A hosting application can intercept crosspoint changes (external
//! interlocks, simulated rejections, mirroring to other systems) without
//! touching the protocol engine: the engine offers every requested change
//! to exactly one authority before committing it.

/// Decides whether a requested crosspoint change may commit
pub trait RoutingAuthority: Send {
    /// Offer a routing change; return false to veto it
    ///
    /// Called once per routing body line, before anything from the owning
    /// message is committed. A veto rejects the whole message.
    fn attempt(&self, output: usize, input: usize) -> bool;
}

/// Default authority: commits every requested change
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl RoutingAuthority for AcceptAll {
    fn attempt(&self, _output: usize, _input: usize) -> bool {
        true
    }
}
