//! Directory image stored in the persistent store
//!
//! Layout at address 0: 4-byte magic, 4-byte little-endian body length,
//! then a JSON body describing every allocated record.

use serde::{Deserialize, Serialize};

use super::endpoint::Endpoint;
use super::store::NodeStore;
use super::types::{NodeFlags, NodeId, NodeState};
use crate::storage::Eeprom;
use crate::{Error, Result};

/// Marks an initialised directory image
const MAGIC: [u8; 4] = *b"MGRD";

/// Magic plus body length
const HEADER_LEN: u64 = 8;

/// Image format version
const IMAGE_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DirectoryImage {
    version: u8,
    nodes: Vec<NodeImage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeImage {
    node_id: NodeId,
    #[serde(default)]
    state: NodeState,
    #[serde(default)]
    flags: NodeFlags,
    /// Hex-encoded DSK
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dsk: Option<String>,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

/// Write every allocated record of `store` to `eeprom`
///
/// # Errors
///
/// Returns error if the image does not fit or the write fails
pub fn save_directory(store: &NodeStore, eeprom: &mut dyn Eeprom) -> Result<()> {
    let image = DirectoryImage {
        version: IMAGE_VERSION,
        nodes: store
            .iter()
            .map(|record| NodeImage {
                node_id: record.node_id(),
                state: record.state,
                flags: record.flags,
                dsk: record.dsk().map(hex::encode),
                endpoints: record.endpoints().iter().cloned().collect(),
            })
            .collect(),
    };
    let body = serde_json::to_vec(&image)?;

    let body_len = u32::try_from(body.len())
        .map_err(|_| Error::Storage(format!("directory image of {} bytes", body.len())))?;
    let capacity = eeprom.size()?;
    if HEADER_LEN + u64::from(body_len) > capacity {
        return Err(Error::Storage(format!(
            "directory image of {body_len} bytes does not fit in {capacity} bytes"
        )));
    }

    eeprom.write(HEADER_LEN, &body)?;
    let mut header = [0u8; 8];
    header[..4].copy_from_slice(&MAGIC);
    header[4..].copy_from_slice(&body_len.to_le_bytes());
    eeprom.write(0, &header)?;

    tracing::info!(nodes = image.nodes.len(), bytes = body_len, "directory saved");
    Ok(())
}

/// Rebuild a node store from `eeprom`
///
/// An image without the magic marker loads as an empty store.
///
/// # Errors
///
/// Returns error if the image is truncated, corrupt, or holds invalid ids
pub fn load_directory(eeprom: &mut dyn Eeprom) -> Result<NodeStore> {
    let capacity = eeprom.size()?;
    if capacity < HEADER_LEN {
        return Err(Error::Storage(format!(
            "store of {capacity} bytes cannot hold a directory header"
        )));
    }

    let mut header = [0u8; 8];
    eeprom.read(0, &mut header)?;
    if header[..4] != MAGIC {
        tracing::info!("no directory image found, starting empty");
        return Ok(NodeStore::new());
    }

    let body_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if HEADER_LEN + u64::from(body_len) > capacity {
        return Err(Error::Storage(format!(
            "directory image length {body_len} exceeds store size {capacity}"
        )));
    }

    let mut body = vec![0u8; body_len as usize];
    eeprom.read(HEADER_LEN, &mut body)?;
    let image: DirectoryImage = serde_json::from_slice(&body)?;
    if image.version != IMAGE_VERSION {
        return Err(Error::Storage(format!(
            "unsupported directory image version {}",
            image.version
        )));
    }

    let mut store = NodeStore::new();
    for node in image.nodes {
        if !node.node_id.is_valid() {
            return Err(Error::Storage(format!(
                "directory image holds invalid node id {}",
                node.node_id
            )));
        }

        let record = store.allocate(node.node_id)?;
        record.state = node.state;
        record.flags = node.flags;
        for endpoint in node.endpoints {
            record.endpoints_mut().add(endpoint)?;
        }

        if let Some(dsk) = node.dsk {
            let dsk = hex::decode(&dsk).map_err(|e| Error::InvalidDsk(format!("{dsk}: {e}")))?;
            store.set_dsk(node.node_id, &dsk)?;
        }
    }

    tracing::info!(nodes = store.len(), "directory loaded");
    Ok(store)
}
