//! Error types for the mesh gateway core

use thiserror::Error;

use crate::command::FrameError;
use crate::nodes::NodeId;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway core
///
/// Invalid node ids are not represented here: they are a caller contract
/// breach and panic at the point of use.
#[derive(Debug, Error)]
pub enum Error {
    /// Node slot is already occupied
    #[error("node {0} already allocated")]
    AlreadyExists(NodeId),

    /// Endpoint id already present on the node
    #[error("endpoint {endpoint} already present on node {node}")]
    DuplicateEndpoint { node: NodeId, endpoint: u8 },

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// DSK rejected (too long or unparsable)
    #[error("invalid dsk: {0}")]
    InvalidDsk(String),

    /// Inbound frame failed validation
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// Frame could not be queued for transmission
    #[error("transmit error: {0}")]
    Transmit(String),

    /// Controller refused to start a removal
    #[error("removal error: {0}")]
    Removal(String),

    /// Gateway event loop is no longer running
    #[error("gateway event loop stopped")]
    Stopped,

    /// Replay script line could not be parsed
    #[error("script error: {0}")]
    Script(String),

    /// Persistent store error
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
