#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args manually to keep the binary lean. Supports environment variable
//! overrides via the `VLIST_DEMO_*` prefix; explicit flags win over both.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
vlist demo: a headless scroll session against a virtualized list

USAGE:
    vlist-demo [OPTIONS]

OPTIONS:
    --count=N            Number of items (default: 1000)
    --item-extent=PX     Fixed item extent (default: 200)
    --client=PX          Viewport extent (default: 600)
    --steps=N            Scroll frames to simulate (default: 40)
    --step=PX            Scroll distance per frame (default: 137)
    --jump-to=INDEX      After scrolling, jump so INDEX is at the top
    --shrink-to=N        Finally replace the collection with N items
    --variable           Use per-item extents (alternating 1x / 1.5x)
    --lazy               Attach simulated intersection observers
    --help, -h           Show this help message
    --version, -V        Show version

OUTPUT:
    One JSON object per line on stdout for every published window, followed
    by a summary line. Logs go to stderr.

ENVIRONMENT VARIABLES:
    VLIST_DEMO_COUNT         Override --count
    VLIST_DEMO_ITEM_EXTENT   Override --item-extent
    VLIST_DEMO_CLIENT        Override --client
    VLIST_DEMO_STEPS         Override --steps
    VLIST_LOG                Log filter (falls back to RUST_LOG, then 'info')
    VLIST_OVERSCAN, VLIST_THROTTLE_MS, VLIST_ROOT_MARGIN, VLIST_THRESHOLD,
    VLIST_LAZY_VISIBILITY, VLIST_ASSUME_VISIBLE
                             List configuration (see vlist-runtime)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Number of items.
    pub count: usize,
    /// Fixed item extent.
    pub item_extent: f64,
    /// Viewport extent.
    pub client_extent: f64,
    /// Number of simulated scroll frames.
    pub steps: u32,
    /// Scroll distance per frame.
    pub step: f64,
    /// Index to jump to after scrolling.
    pub jump_to: Option<usize>,
    /// Final collection size.
    pub shrink_to: Option<usize>,
    /// Use per-item extents.
    pub variable: bool,
    /// Force lazy visibility on.
    pub lazy: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            count: 1000,
            item_extent: 200.0,
            client_extent: 600.0,
            steps: 40,
            step: 137.0,
            jump_to: None,
            shrink_to: None,
            variable: false,
            lazy: false,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse process arguments and environment; exits on help, version or error.
    pub fn parse() -> Self {
        match Self::parse_from(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("vlist-demo {VERSION}");
                process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse from explicit arguments and an env lookup.
    pub fn parse_from<I, F>(args: I, mut get: F) -> Result<Command, String>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Environment first; flags below override it.
        if let Some(val) = get("VLIST_DEMO_COUNT")
            && let Ok(n) = val.parse()
        {
            opts.count = n;
        }
        if let Some(val) = get("VLIST_DEMO_ITEM_EXTENT")
            && let Ok(n) = val.parse()
        {
            opts.item_extent = n;
        }
        if let Some(val) = get("VLIST_DEMO_CLIENT")
            && let Ok(n) = val.parse()
        {
            opts.client_extent = n;
        }
        if let Some(val) = get("VLIST_DEMO_STEPS")
            && let Ok(n) = val.parse()
        {
            opts.steps = n;
        }

        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--variable" => opts.variable = true,
                "--lazy" => opts.lazy = true,
                other => {
                    if let Some(val) = other.strip_prefix("--count=") {
                        opts.count = parse_value("--count", val)?;
                    } else if let Some(val) = other.strip_prefix("--item-extent=") {
                        opts.item_extent = parse_value("--item-extent", val)?;
                    } else if let Some(val) = other.strip_prefix("--client=") {
                        opts.client_extent = parse_value("--client", val)?;
                    } else if let Some(val) = other.strip_prefix("--steps=") {
                        opts.steps = parse_value("--steps", val)?;
                    } else if let Some(val) = other.strip_prefix("--step=") {
                        opts.step = parse_value("--step", val)?;
                    } else if let Some(val) = other.strip_prefix("--jump-to=") {
                        opts.jump_to = Some(parse_value("--jump-to", val)?);
                    } else if let Some(val) = other.strip_prefix("--shrink-to=") {
                        opts.shrink_to = Some(parse_value("--shrink-to", val)?);
                    } else {
                        return Err(format!("Unknown argument: {other}"));
                    }
                }
            }
        }

        Ok(Command::Run(opts))
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse()
        .map_err(|_| format!("Invalid {flag} value: {val}"))
}
