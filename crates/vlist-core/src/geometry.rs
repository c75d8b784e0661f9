#![forbid(unsafe_code)]

//! Geometry models describing a 1D strip of items.
//!
//! A geometry answers "where does item `i` start" and "which item covers
//! offset `y`". Two models are provided:
//!
//! - [`FixedGeometry`]: every item has the same extent; all queries are O(1).
//! - [`PrefixSumGeometry`]: per-item extents supplied by the host, kept in a
//!   [`FenwickTree`] so that offset↔index lookups are O(log n).
//!
//! Both are immutable once built. When the backing collection changes length
//! the host builds a new geometry and hands it to the controller wholesale.

use crate::error::GeometryError;
use crate::fenwick::FenwickTree;

/// Read-only queries over a strip of items `0..len`.
///
/// Offsets live in a caller-chosen 1D coordinate space (typically logical
/// pixels) and start at `0.0` for item 0.
pub trait ExtentModel {
    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the strip has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all item extents; the scrollable content height.
    fn total_extent(&self) -> f64;

    /// Start offset of `index`. `offset_of(len())` equals `total_extent()`;
    /// larger indices are clamped.
    fn offset_of(&self, index: usize) -> f64;

    /// Extent of `index`, or `0.0` when out of range.
    fn extent_of(&self, index: usize) -> f64;

    /// Index of the item containing `offset`, clamped to `0..=len()`.
    ///
    /// Negative and NaN offsets map to `0`; offsets at or past the end map to
    /// `len()`.
    fn index_at_offset(&self, offset: f64) -> usize;

    /// Number of items whose start offset lies strictly before `offset`,
    /// i.e. the exclusive end index of the items needed to cover `[0, offset)`.
    fn end_index_for(&self, offset: f64) -> usize;
}

// ============================================================================
// Fixed extent
// ============================================================================

/// Geometry where every item has the same extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGeometry {
    count: usize,
    item_extent: f64,
}

impl FixedGeometry {
    /// Build a fixed-extent geometry.
    ///
    /// # Errors
    /// Returns [`GeometryError`] when `item_extent` is not a finite positive
    /// number.
    pub fn new(count: usize, item_extent: f64) -> Result<Self, GeometryError> {
        if !item_extent.is_finite() {
            return Err(GeometryError::NonFiniteExtent {
                extent: item_extent,
            });
        }
        if item_extent <= 0.0 {
            return Err(GeometryError::NonPositiveExtent {
                extent: item_extent,
            });
        }
        Ok(Self { count, item_extent })
    }

    /// Build from a signed count, as reported by hosts that use signed lengths.
    ///
    /// # Errors
    /// Returns [`GeometryError::NegativeCount`] for `count < 0`, otherwise the
    /// same errors as [`FixedGeometry::new`].
    pub fn from_signed(count: i64, item_extent: f64) -> Result<Self, GeometryError> {
        let count = usize::try_from(count).map_err(|_| GeometryError::NegativeCount { count })?;
        Self::new(count, item_extent)
    }

    /// A fresh geometry with the same item extent and a new count.
    ///
    /// The extent was validated when `self` was built, so this cannot fail.
    #[must_use]
    pub fn with_count(&self, count: usize) -> Self {
        Self {
            count,
            item_extent: self.item_extent,
        }
    }

    /// The shared item extent.
    #[inline]
    #[must_use]
    pub fn item_extent(&self) -> f64 {
        self.item_extent
    }
}

impl ExtentModel for FixedGeometry {
    #[inline]
    fn len(&self) -> usize {
        self.count
    }

    #[inline]
    fn total_extent(&self) -> f64 {
        self.item_extent * self.count as f64
    }

    #[inline]
    fn offset_of(&self, index: usize) -> f64 {
        self.item_extent * index.min(self.count) as f64
    }

    #[inline]
    fn extent_of(&self, index: usize) -> f64 {
        if index < self.count {
            self.item_extent
        } else {
            0.0
        }
    }

    fn index_at_offset(&self, offset: f64) -> usize {
        if !(offset > 0.0) {
            return 0;
        }
        // Float-to-int casts saturate, so huge offsets land on usize::MAX.
        ((offset / self.item_extent).floor() as usize).min(self.count)
    }

    fn end_index_for(&self, offset: f64) -> usize {
        if !(offset > 0.0) {
            return 0;
        }
        ((offset / self.item_extent).ceil() as usize).min(self.count)
    }
}

// ============================================================================
// Per-item extents
// ============================================================================

/// Geometry with host-supplied per-item extents.
///
/// Extents are estimates or measurements reported by the host; this model
/// does not measure anything itself.
#[derive(Debug, Clone, Default)]
pub struct PrefixSumGeometry {
    tree: FenwickTree,
}

impl PrefixSumGeometry {
    /// Build from per-item extents.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidItemExtent`] for the first extent that is
    /// negative, NaN or infinite.
    pub fn from_extents(extents: &[f64]) -> Result<Self, GeometryError> {
        if let Some((index, &extent)) = extents
            .iter()
            .enumerate()
            .find(|(_, e)| !e.is_finite() || e.is_sign_negative())
        {
            return Err(GeometryError::InvalidItemExtent { index, extent });
        }
        Ok(Self {
            tree: FenwickTree::from_values(extents),
        })
    }
}

impl ExtentModel for PrefixSumGeometry {
    #[inline]
    fn len(&self) -> usize {
        self.tree.len()
    }

    fn total_extent(&self) -> f64 {
        self.tree.total()
    }

    fn offset_of(&self, index: usize) -> f64 {
        self.tree.prefix_sum(index)
    }

    fn extent_of(&self, index: usize) -> f64 {
        self.tree.get(index)
    }

    fn index_at_offset(&self, offset: f64) -> usize {
        if !(offset > 0.0) {
            return 0;
        }
        self.tree.upper_bound(offset)
    }

    fn end_index_for(&self, offset: f64) -> usize {
        if !(offset > 0.0) {
            return 0;
        }
        (self.tree.lower_bound(offset) + 1).min(self.tree.len())
    }
}
