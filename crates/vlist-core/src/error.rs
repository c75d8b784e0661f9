#![forbid(unsafe_code)]

//! Geometry construction errors.

use std::fmt;

/// Rejected geometry parameters.
///
/// A geometry that fails validation is never constructed; callers must supply
/// valid parameters before the model can be used.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Fixed item extent was zero or negative.
    NonPositiveExtent { extent: f64 },
    /// Fixed item extent was NaN or infinite.
    NonFiniteExtent { extent: f64 },
    /// Item count was negative.
    NegativeCount { count: i64 },
    /// A per-item extent was negative, NaN or infinite.
    InvalidItemExtent { index: usize, extent: f64 },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveExtent { extent } => {
                write!(f, "item extent must be positive (got {extent})")
            }
            Self::NonFiniteExtent { extent } => {
                write!(f, "item extent must be finite (got {extent})")
            }
            Self::NegativeCount { count } => {
                write!(f, "item count must be non-negative (got {count})")
            }
            Self::InvalidItemExtent { index, extent } => write!(
                f,
                "extent of item {index} must be finite and non-negative (got {extent})"
            ),
        }
    }
}

impl std::error::Error for GeometryError {}
