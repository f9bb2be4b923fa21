//! Resource directory record types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::endpoint::EndpointList;

/// Highest node id the directory can hold
pub const MAX_NODES: u16 = 232;

/// Longest DSK accepted by the directory (S2 DSK is 16 bytes)
pub const MAX_DSK_LEN: usize = 16;

/// Mesh node identifier, valid in `1..=MAX_NODES`
///
/// Construction does not validate; the store enforces the range when the
/// id is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
    /// Wrap a raw node id
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Raw numeric id
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Whether the id lies in `1..=MAX_NODES`
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 1 && self.0 <= MAX_NODES
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

/// Interview/lifecycle state of a node record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Freshly allocated, nothing known yet
    #[default]
    Created,
    /// Interview in progress
    Probing,
    /// Interview complete
    Done,
    /// Node is being confirmed for removal
    Failing,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Probing => write!(f, "probing"),
            Self::Done => write!(f, "done"),
            Self::Failing => write!(f, "failing"),
        }
    }
}

/// Node capability and security flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct NodeFlags {
    /// Always listening (mains powered)
    #[serde(default)]
    pub listening: bool,
    /// Frequently listening (beam-woken)
    #[serde(default)]
    pub flirs: bool,
    /// Included with S0 security
    #[serde(default)]
    pub security_s0: bool,
    /// Included with S2 security
    #[serde(default)]
    pub security_s2: bool,
}

/// A node in the resource directory
///
/// Owns its DSK buffer and endpoint list; both are released with the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    node_id: NodeId,
    dsk: Option<Box<[u8]>>,
    endpoints: EndpointList,
    /// Lifecycle state
    pub state: NodeState,
    /// Capability flags
    pub flags: NodeFlags,
}

impl NodeRecord {
    /// Zero-initialised record for `node_id`
    #[must_use]
    pub(crate) fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            dsk: None,
            endpoints: EndpointList::new(node_id),
            state: NodeState::default(),
            flags: NodeFlags::default(),
        }
    }

    /// Node id of this record
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Stored DSK, if any
    #[must_use]
    pub fn dsk(&self) -> Option<&[u8]> {
        self.dsk.as_deref()
    }

    /// Replace the DSK buffer, returning the released one
    pub(crate) fn replace_dsk(&mut self, dsk: Box<[u8]>) -> Option<Box<[u8]>> {
        self.dsk.replace(dsk)
    }

    /// Endpoints in discovery order
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointList {
        &self.endpoints
    }

    /// Mutable access to the endpoint list
    pub fn endpoints_mut(&mut self) -> &mut EndpointList {
        &mut self.endpoints
    }
}
