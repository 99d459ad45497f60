//! Existence index: which Library Genesis ids a domain already holds.
//!
//! Backed by a roaring bitmap so tens of millions of sparse ids stay compact.
//! The logical length is the highest id + 1; anything past it reads as absent.

use roaring::RoaringBitmap;

/// Read-only bitset of external ids present in the catalog for one domain.
#[derive(Debug, Clone, Default)]
pub struct ExistenceIndex {
    bits: RoaringBitmap,
}

impl ExistenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as present. Only used while the index is being loaded.
    pub fn insert(&mut self, libgen_id: u32) {
        self.bits.insert(libgen_id);
    }

    /// Whether the id is present. Ids past [`len`](Self::len) are never present.
    pub fn contains(&self, libgen_id: u32) -> bool {
        self.bits.contains(libgen_id)
    }

    /// Logical bitset length: the highest present id + 1, or 0 when empty.
    pub fn len(&self) -> u64 {
        self.bits.max().map_or(0, |max| u64::from(max) + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of ids set.
    pub fn count(&self) -> u64 {
        self.bits.len()
    }
}

impl FromIterator<u32> for ExistenceIndex {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_has_zero_length() {
        let index = ExistenceIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(!index.contains(0));
    }

    #[test]
    fn length_tracks_highest_id() {
        let index: ExistenceIndex = [3, 10, 7].into_iter().collect();
        assert_eq!(index.len(), 11);
        assert_eq!(index.count(), 3);
        assert!(index.contains(10));
        assert!(!index.contains(4));
    }

    #[test]
    fn ids_past_length_read_as_absent() {
        let index: ExistenceIndex = [5].into_iter().collect();
        assert!(!index.contains(6));
        assert!(!index.contains(u32::MAX));
    }
}
