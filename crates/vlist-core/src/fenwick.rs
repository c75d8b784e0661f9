#![forbid(unsafe_code)]

//! Fenwick tree (Binary Indexed Tree) over `f64` item extents.
//!
//! Backs [`PrefixSumGeometry`](crate::geometry::PrefixSumGeometry): entry `i`
//! holds the extent of item `i`, so `prefix_sum(i)` is the start offset of
//! item `i` and `prefix_sum(len)` is the total extent.
//!
//! # Layout
//!
//! Stored 1-indexed in a contiguous `Vec<f64>` of length `n + 1` (index 0
//! unused).
//!
//! # Operations
//!
//! | Operation | Time |
//! |-----------|------|
//! | `from_values(v)` | O(n) |
//! | `add(i, delta)` | O(log n) |
//! | `prefix_sum(k)` | O(log n) |
//! | `upper_bound(t)` / `lower_bound(t)` | O(log n) |
//!
//! # Invariants
//!
//! 1. `tree[i]` stores the sum of the range of values selected by `lowbit(i)`.
//! 2. `prefix_sum(n)` equals the sum of all values.
//! 3. The search methods require every value to be non-negative, which keeps
//!    prefix sums monotone.

/// Prefix-sum tree over non-negative `f64` values.
#[derive(Debug, Clone, Default)]
pub struct FenwickTree {
    tree: Vec<f64>,
    n: usize,
}

impl FenwickTree {
    /// Create a tree of `n` zeros.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            tree: vec![0.0; n + 1],
            n,
        }
    }

    /// Build from initial values in O(n) using parent propagation.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let mut tree = vec![0.0; n + 1];
        tree[1..].copy_from_slice(values);
        for i in 1..=n {
            let parent = i + lowbit(i);
            if parent <= n {
                tree[parent] += tree[i];
            }
        }
        Self { tree, n }
    }

    /// Number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the tree holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Add `delta` to the value at `i` (0-indexed).
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn add(&mut self, i: usize, delta: f64) {
        assert!(i < self.n, "index {i} out of bounds (n={})", self.n);
        let mut idx = i + 1;
        while idx <= self.n {
            self.tree[idx] += delta;
            idx += lowbit(idx);
        }
    }

    /// Sum of the first `k` values (`k` in `0..=len()`); `k` is clamped.
    #[must_use]
    pub fn prefix_sum(&self, k: usize) -> f64 {
        let mut idx = k.min(self.n);
        let mut sum = 0.0;
        while idx > 0 {
            sum += self.tree[idx];
            idx -= lowbit(idx);
        }
        sum
    }

    /// Value at position `i`, or `0.0` when out of range.
    #[must_use]
    pub fn get(&self, i: usize) -> f64 {
        if i >= self.n {
            return 0.0;
        }
        self.prefix_sum(i + 1) - self.prefix_sum(i)
    }

    /// Sum of all values.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.prefix_sum(self.n)
    }

    /// Largest `k` in `0..=len()` with `prefix_sum(k) <= target`.
    ///
    /// Returns `0` when `target` is negative.
    #[must_use]
    pub fn upper_bound(&self, target: f64) -> usize {
        self.descend(|node, remaining| node <= remaining, target)
    }

    /// Largest `k` in `0..=len()` with `prefix_sum(k) < target`.
    ///
    /// Returns `0` when `target <= 0` (no prefix is strictly below it, and
    /// `k = 0` is the conventional floor).
    #[must_use]
    pub fn lower_bound(&self, target: f64) -> usize {
        self.descend(|node, remaining| node < remaining, target)
    }

    /// Binary-lifting descent shared by both bound searches.
    fn descend(&self, take: impl Fn(f64, f64) -> bool, target: f64) -> usize {
        if self.n == 0 || target.is_nan() {
            return 0;
        }
        let mut pos = 0usize;
        let mut remaining = target;
        let mut step = most_significant_bit(self.n);
        while step > 0 {
            let next = pos + step;
            if next <= self.n && take(self.tree[next], remaining) {
                remaining -= self.tree[next];
                pos = next;
            }
            step >>= 1;
        }
        pos
    }
}

#[inline]
fn lowbit(x: usize) -> usize {
    x & x.wrapping_neg()
}

#[inline]
fn most_significant_bit(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 << (usize::BITS - 1 - n.leading_zeros())
}
