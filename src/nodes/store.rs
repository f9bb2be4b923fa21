//! Fixed-capacity node store indexed by node id

use super::types::{MAX_DSK_LEN, MAX_NODES, NodeId, NodeRecord};
use crate::{Error, Result};

/// Slot index for `node_id`
///
/// # Panics
///
/// Panics if `node_id` is outside `1..=MAX_NODES`. Callers validate ids
/// upstream, so an out-of-range id here is a programming error.
fn slot_index(node_id: NodeId) -> usize {
    assert!(
        node_id.is_valid(),
        "invalid node id {node_id} out of range [1:{MAX_NODES}]"
    );
    usize::from(node_id.get() - 1)
}

/// The resource directory: one optional record per node id
#[derive(Debug)]
pub struct NodeStore {
    slots: Box<[Option<NodeRecord>]>,
    allocated: usize,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Create an empty store with `MAX_NODES` slots
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_NODES).map(|_| None).collect(),
            allocated: 0,
        }
    }

    /// Allocate a zero-initialised record at `node_id`
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the slot is occupied
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    pub fn allocate(&mut self, node_id: NodeId) -> Result<&mut NodeRecord> {
        let slot = &mut self.slots[slot_index(node_id)];
        if slot.is_some() {
            return Err(Error::AlreadyExists(node_id));
        }

        self.allocated += 1;
        tracing::debug!(node_id = %node_id, "node record allocated");
        Ok(slot.insert(NodeRecord::new(node_id)))
    }

    /// Get the record for `node_id`, `None` if the slot is empty
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&NodeRecord> {
        self.slots[slot_index(node_id)].as_ref()
    }

    /// Mutable variant of [`NodeStore::get`]
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    pub fn get_mut(&mut self, node_id: NodeId) -> Option<&mut NodeRecord> {
        self.slots[slot_index(node_id)].as_mut()
    }

    /// Whether `node_id` is allocated
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.get(node_id).is_some()
    }

    /// Store `dsk` on the record, releasing any previous key
    ///
    /// Does nothing if `dsk` is empty or the record is not allocated.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDsk` if `dsk` is longer than `MAX_DSK_LEN`
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    pub fn set_dsk(&mut self, node_id: NodeId, dsk: &[u8]) -> Result<()> {
        if dsk.is_empty() {
            return Ok(());
        }
        let Some(record) = self.get_mut(node_id) else {
            return Ok(());
        };
        if dsk.len() > MAX_DSK_LEN {
            return Err(Error::InvalidDsk(format!(
                "{} bytes exceeds maximum of {MAX_DSK_LEN}",
                dsk.len()
            )));
        }

        let previous = record.replace_dsk(dsk.into());
        tracing::debug!(
            node_id = %node_id,
            dsk_len = dsk.len(),
            replaced = previous.is_some(),
            "dsk stored"
        );
        Ok(())
    }

    /// Release the record at `node_id` with its DSK and endpoints
    ///
    /// Returns the released record, or `None` if the slot was empty.
    ///
    /// # Panics
    ///
    /// Panics if `node_id` is out of range
    pub fn free(&mut self, node_id: NodeId) -> Option<NodeRecord> {
        let record = self.slots[slot_index(node_id)].take()?;
        self.allocated -= 1;
        tracing::debug!(node_id = %node_id, "node record freed");
        Some(record)
    }

    /// Allocated records in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of allocated records
    #[must_use]
    pub const fn len(&self) -> usize {
        self.allocated
    }

    /// Whether no record is allocated
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allocated == 0
    }
}
