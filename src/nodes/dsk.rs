//! DSK (device specific key) index and text form

use std::fmt;
use std::str::FromStr;

use super::store::NodeStore;
use super::types::{MAX_DSK_LEN, NodeRecord};
use crate::Error;

impl NodeStore {
    /// Find the record whose stored DSK equals `dsk`
    ///
    /// Match requires equal length and content; a stored key that is a
    /// prefix of the query (or the reverse) does not match. Returns `None`
    /// for an empty query.
    #[must_use]
    pub fn lookup_by_dsk(&self, dsk: &[u8]) -> Option<&NodeRecord> {
        if dsk.is_empty() {
            return None;
        }
        self.iter().find(|record| record.dsk() == Some(dsk))
    }
}

/// Owned DSK with the conventional grouped text form
///
/// Even-length keys render as 5-digit decimal groups of big-endian 16-bit
/// words joined by `-` (`34028-23669-...`); other lengths render as hex.
/// A two-byte key is a single group with no dash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dsk(Vec<u8>);

impl Dsk {
    /// Wrap raw key bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Dsk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Dsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() % 2 != 0 {
            return write!(f, "{}", hex::encode(&self.0));
        }
        for (i, pair) in self.0.chunks_exact(2).enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{:05}", u16::from_be_bytes([pair[0], pair[1]]))?;
        }
        Ok(())
    }
}

impl FromStr for Dsk {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let single_group = s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit());
        let bytes = if single_group || s.contains('-') {
            parse_grouped(s)?
        } else {
            hex::decode(s).map_err(|e| Error::InvalidDsk(format!("{s}: {e}")))?
        };

        if bytes.is_empty() || bytes.len() > MAX_DSK_LEN {
            return Err(Error::InvalidDsk(format!(
                "{s}: expected 1..={MAX_DSK_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }
}

fn parse_grouped(s: &str) -> crate::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(MAX_DSK_LEN);
    for group in s.split('-') {
        let word: u16 = group
            .parse()
            .map_err(|_| Error::InvalidDsk(format!("{s}: bad group '{group}'")))?;
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeId;

    fn store_with(keys: &[(u16, &[u8])]) -> NodeStore {
        let mut store = NodeStore::new();
        for (id, key) in keys {
            store.allocate(NodeId::new(*id)).unwrap();
            store.set_dsk(NodeId::new(*id), key).unwrap();
        }
        store
    }

    #[test]
    fn empty_query_is_not_found() {
        let store = store_with(&[(1, &[0xAA])]);
        assert!(store.lookup_by_dsk(&[]).is_none());
    }

    #[test]
    fn no_match_is_not_found() {
        let store = store_with(&[(1, &[0xAA, 0xBB])]);
        assert!(store.lookup_by_dsk(&[0xCC, 0xDD]).is_none());
    }

    #[test]
    fn requires_exact_length() {
        let store = store_with(&[(4, &[0xAA, 0xBB])]);

        assert!(store.lookup_by_dsk(&[0xAA, 0xBB, 0xCC]).is_none());
        assert!(store.lookup_by_dsk(&[0xAA]).is_none());
        assert_eq!(
            store.lookup_by_dsk(&[0xAA, 0xBB]).unwrap().node_id(),
            NodeId::new(4)
        );
    }

    #[test]
    fn skips_records_without_dsk() {
        let mut store = store_with(&[(9, &[0x01, 0x02])]);
        store.allocate(NodeId::new(2)).unwrap();

        assert_eq!(
            store.lookup_by_dsk(&[0x01, 0x02]).unwrap().node_id(),
            NodeId::new(9)
        );
    }

    #[test]
    fn overwritten_key_no_longer_matches() {
        let mut store = store_with(&[(6, &[1, 1, 1])]);
        store.set_dsk(NodeId::new(6), &[2, 2, 2]).unwrap();

        assert!(store.lookup_by_dsk(&[1, 1, 1]).is_none());
        assert_eq!(
            store.lookup_by_dsk(&[2, 2, 2]).unwrap().node_id(),
            NodeId::new(6)
        );
    }

    #[test]
    fn freed_record_no_longer_matches() {
        let mut store = store_with(&[(6, &[7, 7])]);
        store.free(NodeId::new(6));
        assert!(store.lookup_by_dsk(&[7, 7]).is_none());
    }

    #[test]
    fn first_match_wins_on_duplicate_keys() {
        let store = store_with(&[(12, &[5, 5]), (3, &[5, 5])]);
        assert_eq!(store.lookup_by_dsk(&[5, 5]).unwrap().node_id(), NodeId::new(3));
    }

    #[test]
    fn grouped_text_form() {
        let dsk = Dsk::new(vec![0x84, 0xEC, 0x5C, 0x75]);
        assert_eq!(dsk.to_string(), "34028-23669");

        let parsed: Dsk = "34028-23669".parse().unwrap();
        assert_eq!(parsed, dsk);
    }

    #[test]
    fn leading_zeros_are_padded() {
        let dsk = Dsk::new(vec![0x00, 0x07]);
        assert_eq!(dsk.to_string(), "00007");
    }

    #[test]
    fn hex_text_form() {
        let parsed: Dsk = "aabbcc".parse().unwrap();
        assert_eq!(parsed.as_bytes(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(parsed.to_string(), "aabbcc");
    }

    #[test]
    fn rejects_bad_text() {
        assert!("".parse::<Dsk>().is_err());
        assert!("12345-99999".parse::<Dsk>().is_err());
        assert!("zz".parse::<Dsk>().is_err());
        assert!("00".repeat(MAX_DSK_LEN + 1).parse::<Dsk>().is_err());
    }

    #[test]
    fn text_form_round_trips() {
        let keys: [&[u8]; 4] = [&[0xAA, 0xBB], &[0x00, 0x07], &[0x01, 0x02, 0x03], &[0x5C; 16]];
        for key in keys {
            let text = Dsk::new(key).to_string();
            let parsed: Dsk = text.parse().unwrap();
            assert_eq!(parsed.as_bytes(), key, "{text}");
        }
        assert_eq!("43707".parse::<Dsk>().unwrap().as_bytes(), &[0xAA, 0xBB]);
    }
}
