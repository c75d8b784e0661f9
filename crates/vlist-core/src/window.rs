#![forbid(unsafe_code)]

//! Viewport and render-window computation.
//!
//! [`compute_window`] is a pure function of `(viewport, geometry, overscan)`:
//! it returns the contiguous index range that must be materialized so that the
//! visible span `[scroll_offset, scroll_offset + client_extent]` is fully
//! covered, extended by `overscan` items on each side.
//!
//! # Invariants
//!
//! 1. `0 <= start_index <= end_index <= geometry.len()`.
//! 2. `offset == geometry.offset_of(start_index)`.
//! 3. The span `[offset, offset_of(end_index))` contains the visible span
//!    intersected with `[0, total_extent]`.
//! 4. `start_index` is monotone non-decreasing in `scroll_offset`.
//!
//! Out-of-range viewports (negative, NaN or infinite offsets; zero or negative
//! client extents) are clamped by [`Viewport::sanitized`] and never rejected.

use std::ops::Range;

use crate::geometry::ExtentModel;

/// Host-reported scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    /// Distance scrolled from the top of the content.
    pub scroll_offset: f64,
    /// Visible extent of the scroll container.
    pub client_extent: f64,
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(scroll_offset: f64, client_extent: f64) -> Self {
        Self {
            scroll_offset,
            client_extent,
        }
    }

    /// Clamp both fields into `[0, f64::MAX]`, mapping NaN to `0.0`.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            scroll_offset: clamp_non_negative(self.scroll_offset),
            client_extent: clamp_non_negative(self.client_extent),
        }
    }

    /// End of the visible span.
    #[inline]
    #[must_use]
    pub fn visible_end(&self) -> f64 {
        self.scroll_offset + self.client_extent
    }
}

fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        0.0
    } else {
        value.min(f64::MAX)
    }
}

/// The materialized index range plus the absolute offset of its first item.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    /// First rendered index (inclusive).
    pub start_index: usize,
    /// Last rendered index (exclusive).
    pub end_index: usize,
    /// Start offset of `start_index`.
    pub offset: f64,
}

impl Window {
    /// The empty window at the origin.
    pub const EMPTY: Self = Self {
        start_index: 0,
        end_index: 0,
        offset: 0.0,
    };

    /// Number of rendered items. An inverted window counts as empty.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Whether no items are rendered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered indices.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Whether `index` is rendered.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }
}

/// Compute the render window for a viewport.
///
/// Pure and deterministic: the same inputs always yield the same window.
#[must_use]
pub fn compute_window<G: ExtentModel + ?Sized>(
    viewport: Viewport,
    geometry: &G,
    overscan: usize,
) -> Window {
    let viewport = viewport.sanitized();
    let count = geometry.len();

    #[cfg(feature = "tracing")]
    let _span = tracing::trace_span!(
        "compute_window",
        scroll_offset = viewport.scroll_offset,
        client_extent = viewport.client_extent,
        count,
        overscan
    )
    .entered();

    if count == 0 {
        return Window::EMPTY;
    }

    let raw_start = geometry.index_at_offset(viewport.scroll_offset).min(count);
    let raw_end = geometry
        .end_index_for(viewport.visible_end())
        .clamp(raw_start, count);

    let start_index = raw_start.saturating_sub(overscan);
    let end_index = raw_end.saturating_add(overscan).min(count);

    Window {
        start_index,
        end_index,
        offset: geometry.offset_of(start_index),
    }
}

/// Index ranges that must be created and destroyed when moving between windows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowDelta {
    /// Indices present in the new window but not the old one.
    pub entered: Vec<Range<usize>>,
    /// Indices present in the old window but not the new one.
    pub exited: Vec<Range<usize>>,
}

impl WindowDelta {
    /// Compute the delta from `old` to `new`.
    #[must_use]
    pub fn between(old: &Window, new: &Window) -> Self {
        Self {
            entered: difference(new.indices(), old.indices()),
            exited: difference(old.indices(), new.indices()),
        }
    }

    /// Whether the windows cover the same indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }

    /// Iterate every entered index in ascending order.
    pub fn entered_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entered.iter().flat_map(Clone::clone)
    }

    /// Iterate every exited index in ascending order.
    pub fn exited_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.exited.iter().flat_map(Clone::clone)
    }
}

/// `a \ b` for half-open ranges; at most two pieces.
fn difference(a: Range<usize>, b: Range<usize>) -> Vec<Range<usize>> {
    if a.is_empty() {
        return Vec::new();
    }
    if b.is_empty() || b.end <= a.start || b.start >= a.end {
        return vec![a];
    }
    let mut out = Vec::with_capacity(2);
    if a.start < b.start {
        out.push(a.start..b.start);
    }
    if b.end < a.end {
        out.push(b.end..a.end);
    }
    out
}
