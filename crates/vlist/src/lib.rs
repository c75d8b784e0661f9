#![forbid(unsafe_code)]

//! vlist public facade crate.
//!
//! Re-exports the geometry models and window calculator from `vlist-core` and
//! the controller stack from `vlist-runtime`, plus a top-level [`Error`] and a
//! prelude.
//!
//! ```
//! use vlist::prelude::*;
//!
//! let geometry = FixedGeometry::new(1000, 200.0)?;
//! let window = compute_window(Viewport::new(0.0, 600.0), &geometry, 2);
//! assert_eq!(window.end_index, 5);
//! # Ok::<(), vlist::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use vlist_core::{
    ExtentModel, FenwickTree, FixedGeometry, GeometryError, ItemKey, PrefixSumGeometry,
    RenderedItem, Viewport, Window, WindowDelta, compute_window, render_window,
    render_window_keyed,
};

// --- Runtime re-exports ----------------------------------------------------

pub use vlist_runtime::{
    ConfigError, ControllerStats, FrameOutcome, FrameToken, ItemVisibility, ListConfig,
    ListConfigParse, ListenerId, ObserverId, ObserverOptions, PushOutcome, Quantum,
    RecomputeSignal, ScrollAlign, ScrollSubscription, ScrollThrottler, TeardownReport,
    ThrottleStats, ViewportController, ViewportHost, VisibilityTracker, VisibilityUpdate,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for vlist setup.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Geometry parameters were rejected.
    Geometry(GeometryError),
    /// One or more configuration values were rejected.
    Config(Vec<ConfigError>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(err) => write!(f, "{err}"),
            Self::Config(errors) => {
                write!(f, "invalid configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Geometry(err) => Some(err),
            Self::Config(errors) => errors
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<GeometryError> for Error {
    fn from(err: GeometryError) -> Self {
        Self::Geometry(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(vec![err])
    }
}

impl From<Vec<ConfigError>> for Error {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self::Config(errors)
    }
}

/// Standard result type for vlist APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Constructors ----------------------------------------------------------

/// Validate `config`, build a fixed-extent geometry and start a controller.
///
/// # Errors
/// [`Error::Config`] for invalid configuration, [`Error::Geometry`] for an
/// invalid item extent.
pub fn fixed_list<H: ViewportHost>(
    host: H,
    count: usize,
    item_extent: f64,
    client_extent: f64,
    config: ListConfig,
) -> Result<ViewportController<FixedGeometry, H>> {
    config.validate()?;
    let geometry = FixedGeometry::new(count, item_extent)?;
    Ok(ViewportController::new(host, geometry, config, client_extent))
}

/// Validate `config`, build a prefix-sum geometry and start a controller.
///
/// # Errors
/// [`Error::Config`] for invalid configuration, [`Error::Geometry`] for an
/// invalid per-item extent.
pub fn variable_list<H: ViewportHost>(
    host: H,
    extents: &[f64],
    client_extent: f64,
    config: ListConfig,
) -> Result<ViewportController<PrefixSumGeometry, H>> {
    config.validate()?;
    let geometry = PrefixSumGeometry::from_extents(extents)?;
    Ok(ViewportController::new(host, geometry, config, client_extent))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, ExtentModel, FixedGeometry, ItemKey, ListConfig, PrefixSumGeometry, Result,
        ScrollAlign, Viewport, ViewportController, ViewportHost, Window, WindowDelta,
        compute_window, fixed_list, variable_list,
    };

    pub use crate::{core, runtime};
}

pub use vlist_core as core;
pub use vlist_runtime as runtime;
