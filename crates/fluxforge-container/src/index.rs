//! Keyed lookup over the metadata stream.
//!
//! Metadata records live in their own section, ordered by write time, which
//! is not the order segment keys appear in the entry stream. The index is
//! built once up front so each lookup is a point query rather than a scan.

use crate::records::MetaRecord;
use fluxforge_common::{Error, Result};
use std::collections::HashMap;

/// Index over a container's metadata records, keyed by `metakey`.
pub struct MetaIndex {
    records: Vec<MetaRecord>,
    by_key: HashMap<u32, usize>,
}

impl MetaIndex {
    /// Build the index from a decoded meta section.
    ///
    /// Keys are unique per segment; if a corrupt input repeats one, the last
    /// record wins.
    pub fn build(records: Vec<MetaRecord>) -> Self {
        let mut by_key = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            by_key.insert(record.metakey, i);
        }
        Self { records, by_key }
    }

    /// Fetch the metadata record for a segment key.
    ///
    /// A key with no record is a fatal input-integrity error; the caller is
    /// expected to abort, not retry.
    pub fn lookup(&self, key: u32) -> Result<&MetaRecord> {
        self.by_key
            .get(&key)
            .map(|&i| &self.records[i])
            .ok_or(Error::MetaNotFound { key })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in stored order.
    pub fn records(&self) -> &[MetaRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: u32) -> MetaRecord {
        MetaRecord {
            metakey: key,
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_out_of_order_keys() {
        let index = MetaIndex::build(vec![meta(30), meta(10), meta(20)]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup(10).unwrap().metakey, 10);
        assert_eq!(index.lookup(30).unwrap().metakey, 30);
    }

    #[test]
    fn test_lookup_missing_key() {
        let index = MetaIndex::build(vec![meta(1)]);
        let err = index.lookup(2).unwrap_err();
        assert!(matches!(err, Error::MetaNotFound { key: 2 }));
    }

    #[test]
    fn test_zero_is_a_valid_key() {
        let index = MetaIndex::build(vec![meta(0)]);
        assert_eq!(index.lookup(0).unwrap().metakey, 0);
    }

    #[test]
    fn test_empty_index() {
        let index = MetaIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.lookup(0).is_err());
    }
}
