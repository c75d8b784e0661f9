#![forbid(unsafe_code)]

//! Event-driven runtime for virtualized lists.
//!
//! - [`config`]: [`ListConfig`] with env overrides and validation.
//! - [`throttle`]: trailing-edge scroll throttling.
//! - [`host`]: the [`ViewportHost`] trait the platform implements.
//! - [`visibility`]: per-item intersection state machine.
//! - [`controller`]: [`ViewportController`], which ties them together.

pub mod config;
pub mod controller;
pub mod host;
pub mod throttle;
pub mod visibility;

pub use config::{ConfigError, ListConfig, ListConfigParse};
pub use controller::{ControllerStats, ScrollAlign, TeardownReport, ViewportController};
pub use host::{FrameToken, ListenerId, ObserverId, ScrollSubscription, ViewportHost};
pub use throttle::{
    FrameOutcome, PushOutcome, Quantum, RecomputeSignal, ScrollThrottler, ThrottleStats,
};
pub use visibility::{
    ItemVisibility, ObserverOptions, VisibilityTracker, VisibilityUpdate,
};
