//! Fenwick tree (Binary Indexed Tree) over row extents.
//!
//! Answers "where does row `i` start" and "which row covers offset `y`" in
//! O(log n), with O(log n) point updates when a single row is resized.
//!
//! # Layout
//!
//! Stored 1-indexed in a contiguous `Vec<u64>` of length `n + 1` (index 0
//! unused). Extents are `u32`; sums are kept in `u64` so a long list of tall
//! rows cannot overflow.
//!
//! # Operations
//!
//! | Operation | Time |
//! |-----------|------|
//! | `from_extents(values)` | O(n) |
//! | `set(i, extent)` | O(log n) |
//! | `start_of(i)` / `end_of(i)` | O(log n) |
//! | `row_at(offset)` | O(log n) |
//!
//! # Invariants
//!
//! 1. `tree[i]` holds the sum of the `lowbit(i)` extents ending at row `i - 1`.
//! 2. `end_of(n - 1) == total()`.
//! 3. `start_of(i + 1) == end_of(i)`.

/// Prefix sums over row extents.
#[derive(Debug, Clone, Default)]
pub struct FenwickTree {
    tree: Vec<u64>,
    extents: Vec<u32>,
}

impl FenwickTree {
    /// Build from row extents in O(n).
    pub fn from_extents(extents: &[u32]) -> Self {
        let n = extents.len();
        let mut tree = vec![0u64; n + 1];
        for (i, &extent) in extents.iter().enumerate() {
            tree[i + 1] = u64::from(extent);
        }
        for i in 1..=n {
            let parent = i + lowbit(i);
            if parent <= n {
                tree[parent] += tree[i];
            }
        }
        Self {
            tree,
            extents: extents.to_vec(),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    /// Whether there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Extent of row `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<u32> {
        self.extents.get(i).copied()
    }

    /// Replace the extent of row `i`. Out-of-range rows are ignored.
    pub fn set(&mut self, i: usize, extent: u32) {
        let Some(slot) = self.extents.get_mut(i) else {
            return;
        };
        let old = std::mem::replace(slot, extent);
        if old == extent {
            return;
        }
        let n = self.extents.len();
        let mut idx = i + 1;
        while idx <= n {
            // Every covering node already includes `old`.
            self.tree[idx] = self.tree[idx] - u64::from(old) + u64::from(extent);
            idx += lowbit(idx);
        }
    }

    /// Offset at which row `i` starts: the sum of rows `0..i`.
    ///
    /// `start_of(len())` is the total extent.
    pub fn start_of(&self, i: usize) -> u64 {
        let mut idx = i.min(self.len());
        let mut sum = 0u64;
        while idx > 0 {
            sum += self.tree[idx];
            idx -= lowbit(idx);
        }
        sum
    }

    /// Offset at which row `i` ends.
    pub fn end_of(&self, i: usize) -> u64 {
        self.start_of(i + 1)
    }

    /// Sum of all extents.
    pub fn total(&self) -> u64 {
        self.start_of(self.len())
    }

    /// Index of the row covering `offset`, i.e. the number of rows that end
    /// at or before it. Returns `len()` when `offset >= total()`.
    pub fn row_at(&self, offset: u64) -> usize {
        let n = self.len();
        let mut pos = 0usize;
        let mut remaining = offset;
        let mut step = most_significant_bit(n);
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                remaining -= self.tree[next];
                pos = next;
            }
            step >>= 1;
        }
        pos
    }
}

/// Lowest set bit of `x`. E.g., `lowbit(6) = 2`, `lowbit(4) = 4`.
#[inline]
fn lowbit(x: usize) -> usize {
    x & x.wrapping_neg()
}

/// Most significant bit that fits within `n`.
#[inline]
fn most_significant_bit(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 << (usize::BITS - 1 - n.leading_zeros())
}
