//! Track which columns of an entry were modified.
//!
//! An UPDATE only writes the columns whose values changed since the entry was
//! loaded; the change tracker records those as indices into the table schema.

/// A compact bitset representing "column is modified" for indices `0..len`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSet {
    len: usize,
    bits: Box<[u64]>,
}

impl ColumnSet {
    /// Create an empty set for `len` columns.
    #[must_use]
    pub fn empty(len: usize) -> Self {
        let words = len.div_ceil(64);
        Self {
            len,
            bits: vec![0u64; words].into_boxed_slice(),
        }
    }

    /// Create a full set for `len` columns.
    #[must_use]
    pub fn all(len: usize) -> Self {
        let mut s = Self::empty(len);
        for idx in 0..len {
            s.insert(idx);
        }
        s
    }

    /// Number of columns represented by this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if `len == 0`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark a column index. Indices outside `0..len` are ignored.
    pub fn insert(&mut self, idx: usize) {
        if idx >= self.len {
            return;
        }
        if let Some(w) = self.bits.get_mut(idx / 64) {
            *w |= 1u64 << (idx % 64);
        }
    }

    /// Clear a column index.
    pub fn remove(&mut self, idx: usize) {
        if let Some(w) = self.bits.get_mut(idx / 64) {
            *w &= !(1u64 << (idx % 64));
        }
    }

    /// Check whether a column index is marked.
    #[must_use]
    pub fn contains(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        self.bits
            .get(idx / 64)
            .is_some_and(|w| (w & (1u64 << (idx % 64))) != 0)
    }

    /// Number of marked columns.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate marked indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.contains(i))
    }
}
