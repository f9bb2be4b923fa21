//! Node resource directory
//!
//! The authoritative per-node database: identity, endpoints and security
//! material, held in a fixed-capacity store indexed by node id

pub mod dsk;
pub mod endpoint;
pub mod persist;
pub mod store;
pub mod types;

pub use dsk::Dsk;
pub use endpoint::{Endpoint, EndpointList};
pub use persist::{load_directory, save_directory};
pub use store::NodeStore;
pub use types::{MAX_DSK_LEN, MAX_NODES, NodeFlags, NodeId, NodeRecord, NodeState};
