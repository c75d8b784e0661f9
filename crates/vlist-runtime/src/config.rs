#![forbid(unsafe_code)]

//! List configuration with environment overrides.
//!
//! | Field | Default | Env var |
//! |-------|---------|---------|
//! | `overscan` | 2 | `VLIST_OVERSCAN` |
//! | `quantum` | frame tick | `VLIST_THROTTLE_MS` (`0` = frame tick) |
//! | `observer.root_margin` | 200 | `VLIST_ROOT_MARGIN` |
//! | `observer.threshold` | 1.0 | `VLIST_THRESHOLD` |
//! | `lazy_visibility` | off | `VLIST_LAZY_VISIBILITY` |
//! | `assume_visible_on_mount` | off | `VLIST_ASSUME_VISIBLE` |

use std::env;
use std::fmt;
use std::time::Duration;

use crate::throttle::Quantum;
use crate::visibility::ObserverOptions;

/// Env var overriding [`ListConfig::overscan`].
pub const ENV_OVERSCAN: &str = "VLIST_OVERSCAN";
/// Env var overriding [`ListConfig::quantum`] (milliseconds, `0` = frame tick).
pub const ENV_THROTTLE_MS: &str = "VLIST_THROTTLE_MS";
/// Env var overriding [`ObserverOptions::root_margin`].
pub const ENV_ROOT_MARGIN: &str = "VLIST_ROOT_MARGIN";
/// Env var overriding [`ObserverOptions::threshold`].
pub const ENV_THRESHOLD: &str = "VLIST_THRESHOLD";
/// Env var overriding [`ListConfig::lazy_visibility`].
pub const ENV_LAZY_VISIBILITY: &str = "VLIST_LAZY_VISIBILITY";
/// Env var overriding [`ListConfig::assume_visible_on_mount`].
pub const ENV_ASSUME_VISIBLE: &str = "VLIST_ASSUME_VISIBLE";

/// Default overscan on each side of the visible range.
pub const DEFAULT_OVERSCAN: usize = 2;

/// Configuration for a virtualized list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListConfig {
    /// Extra items rendered before and after the visible range.
    pub overscan: usize,
    /// Scroll throttling quantum.
    pub quantum: Quantum,
    /// Options for per-item intersection observers.
    pub observer: ObserverOptions,
    /// Attach intersection observers to rendered items.
    ///
    /// Covers the whole list; narrow it to individual items with
    /// [`ViewportController::set_visibility_opt_in`](crate::ViewportController::set_visibility_opt_in).
    pub lazy_visibility: bool,
    /// Newly mounted items start as intersecting until told otherwise.
    pub assume_visible_on_mount: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            overscan: DEFAULT_OVERSCAN,
            quantum: Quantum::FrameTick,
            observer: ObserverOptions::default(),
            lazy_visibility: false,
            assume_visible_on_mount: false,
        }
    }
}

/// Parsed configuration plus every problem found on the way.
#[derive(Debug, Clone)]
pub struct ListConfigParse {
    pub config: ListConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ListConfig {
    /// Set the overscan.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set the throttling quantum.
    #[must_use]
    pub fn with_quantum(mut self, quantum: Quantum) -> Self {
        self.quantum = quantum;
        self
    }

    /// Set the observer options.
    #[must_use]
    pub fn with_observer(mut self, observer: ObserverOptions) -> Self {
        self.observer = observer;
        self
    }

    /// Enable or disable lazy-visibility tracking.
    #[must_use]
    pub fn with_lazy_visibility(mut self, enabled: bool) -> Self {
        self.lazy_visibility = enabled;
        self
    }

    /// Start mounted items as intersecting.
    #[must_use]
    pub fn with_assume_visible_on_mount(mut self, enabled: bool) -> Self {
        self.assume_visible_on_mount = enabled;
        self
    }

    /// Parse config from environment variables, dropping diagnostics.
    #[must_use]
    pub fn from_env() -> ListConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ListConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config from an arbitrary lookup (for testing).
    pub fn from_env_with<F>(mut get: F) -> ListConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = ListConfig::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_OVERSCAN) {
            match parse_usize(&value) {
                Some(parsed) => config.overscan = parsed,
                None => errors.push(ConfigError::new(
                    "overscan",
                    value,
                    "expected non-negative integer",
                )),
            }
        }

        if let Some(value) = get(ENV_THROTTLE_MS) {
            match value.trim().parse::<u64>() {
                Ok(0) => config.quantum = Quantum::FrameTick,
                Ok(ms) => config.quantum = Quantum::Interval(Duration::from_millis(ms)),
                Err(_) => errors.push(ConfigError::new(
                    "quantum",
                    value,
                    "expected milliseconds (0 = frame tick)",
                )),
            }
        }

        if let Some(value) = get(ENV_ROOT_MARGIN) {
            match parse_f64(&value) {
                Some(parsed) => config.observer.root_margin = parsed,
                None => errors.push(ConfigError::new("root_margin", value, "expected number")),
            }
        }

        if let Some(value) = get(ENV_THRESHOLD) {
            match parse_f64(&value) {
                Some(parsed) => config.observer.threshold = parsed,
                None => errors.push(ConfigError::new("threshold", value, "expected number")),
            }
        }

        if let Some(value) = get(ENV_LAZY_VISIBILITY) {
            match parse_bool(&value) {
                Some(parsed) => config.lazy_visibility = parsed,
                None => errors.push(ConfigError::new(
                    "lazy_visibility",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_ASSUME_VISIBLE) {
            match parse_bool(&value) {
                Some(parsed) => config.assume_visible_on_mount = parsed,
                None => errors.push(ConfigError::new(
                    "assume_visible_on_mount",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Err(mut validation) = config.validate() {
            errors.append(&mut validation);
        }

        if !errors.is_empty() {
            tracing::debug!(target: "vlist.config", errors = errors.len(), "config_errors");
        }

        ListConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        let margin = self.observer.root_margin;
        if !margin.is_finite() {
            errors.push(ConfigError::new(
                "root_margin",
                margin.to_string(),
                "must be finite",
            ));
        }
        let threshold = self.observer.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ConfigError::new(
                "threshold",
                threshold.to_string(),
                "must be in [0, 1]",
            ));
        }
        if self.assume_visible_on_mount && !self.lazy_visibility {
            errors.push(ConfigError::new(
                "assume_visible_on_mount",
                "true",
                "requires lazy_visibility=true",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Short human-readable summary for logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        let quantum = match self.quantum {
            Quantum::FrameTick => "frame".to_string(),
            Quantum::Interval(d) => format!("{}ms", d.as_millis()),
        };
        let lazy = if self.lazy_visibility { "on" } else { "off" };
        format!(
            "overscan={} throttle={quantum} lazy={lazy} margin={} threshold={}",
            self.overscan, self.observer.root_margin, self.observer.threshold
        )
    }
}

#[inline]
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[inline]
fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}
