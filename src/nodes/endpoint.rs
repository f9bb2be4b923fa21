//! Per-node endpoint list

use serde::{Deserialize, Serialize};

use super::types::NodeId;
use crate::{Error, Result};

/// Logical sub-function of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint id (0 is the root device)
    pub endpoint_id: u8,

    /// Command classes advertised by the endpoint
    #[serde(default)]
    pub command_classes: Vec<u8>,

    /// Configured name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Configured location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Endpoint {
    /// Endpoint with no advertised classes
    #[must_use]
    pub const fn new(endpoint_id: u8) -> Self {
        Self {
            endpoint_id,
            command_classes: Vec::new(),
            name: None,
            location: None,
        }
    }

    /// Whether the endpoint advertises `class`
    #[must_use]
    pub fn supports(&self, class: u8) -> bool {
        self.command_classes.contains(&class)
    }
}

/// Endpoints of one node in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointList {
    node_id: NodeId,
    endpoints: Vec<Endpoint>,
}

impl EndpointList {
    pub(crate) const fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            endpoints: Vec::new(),
        }
    }

    /// Append a newly discovered endpoint
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEndpoint` if the endpoint id is already listed
    pub fn add(&mut self, endpoint: Endpoint) -> Result<()> {
        if self.get(endpoint.endpoint_id).is_some() {
            return Err(Error::DuplicateEndpoint {
                node: self.node_id,
                endpoint: endpoint.endpoint_id,
            });
        }
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Get an endpoint by id
    #[must_use]
    pub fn get(&self, endpoint_id: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.endpoint_id == endpoint_id)
    }

    /// Get a mutable endpoint by id
    pub fn get_mut(&mut self, endpoint_id: u8) -> Option<&mut Endpoint> {
        self.endpoints
            .iter_mut()
            .find(|e| e.endpoint_id == endpoint_id)
    }

    /// Remove an endpoint, keeping the order of the rest
    pub fn remove(&mut self, endpoint_id: u8) -> Option<Endpoint> {
        let pos = self
            .endpoints
            .iter()
            .position(|e| e.endpoint_id == endpoint_id)?;
        Some(self.endpoints.remove(pos))
    }

    /// Iterate in discovery order
    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    /// Number of endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl<'a> IntoIterator for &'a EndpointList {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
