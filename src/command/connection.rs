//! Connection context delivered with every inbound frame

use super::class::Scheme;
use crate::nodes::NodeId;

/// Where a frame came from and how it was secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Sending node
    pub source: NodeId,
    /// Sending endpoint (0 for the root device)
    pub source_endpoint: u8,
    /// Addressed local endpoint
    pub destination_endpoint: u8,
    /// Security scheme the frame was received with
    pub scheme: Scheme,
}

impl Connection {
    /// Root-to-root connection from `source`
    #[must_use]
    pub const fn new(source: NodeId, scheme: Scheme) -> Self {
        Self {
            source,
            source_endpoint: 0,
            destination_endpoint: 0,
            scheme,
        }
    }

    /// Set the endpoint pair
    #[must_use]
    pub const fn with_endpoints(mut self, source: u8, destination: u8) -> Self {
        self.source_endpoint = source;
        self.destination_endpoint = destination;
        self
    }
}
