#![forbid(unsafe_code)]

//! Core data model for list virtualization.
//!
//! Geometry models, the pure window calculator, window diffing and item keys.
//! Nothing in this crate performs I/O or holds host resources; see
//! `vlist-runtime` for the event-driven controller.
//!
//! # Example
//!
//! ```
//! use vlist_core::{FixedGeometry, Viewport, Window, compute_window};
//!
//! let geometry = FixedGeometry::new(1000, 200.0).unwrap();
//! let window = compute_window(Viewport::new(4000.0, 600.0), &geometry, 2);
//! assert_eq!(
//!     window,
//!     Window { start_index: 18, end_index: 25, offset: 3600.0 }
//! );
//! ```

pub mod error;
pub mod fenwick;
pub mod geometry;
pub mod item;
pub mod window;

pub use error::GeometryError;
pub use fenwick::FenwickTree;
pub use geometry::{ExtentModel, FixedGeometry, PrefixSumGeometry};
pub use item::{ItemKey, RenderedItem, render_window, render_window_keyed};
pub use window::{Viewport, Window, WindowDelta, compute_window};
