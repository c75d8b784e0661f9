#![forbid(unsafe_code)]

//! Headless vlist demo: scrolls a simulated list and prints every published
//! window as JSONL.

mod cli;
mod session;

use std::io::{self, BufWriter, Write};
use std::process;

use tracing_subscriber::EnvFilter;
use vlist::ListConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VLIST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

fn main() {
    let opts = cli::Opts::parse();
    init_tracing();

    let parsed = ListConfig::from_env_with_diagnostics();
    for err in &parsed.errors {
        tracing::warn!(field = err.field, value = %err.value, "{}", err.message);
    }
    let config = if parsed.errors.is_empty() {
        parsed.config
    } else {
        tracing::warn!("falling back to default list configuration");
        ListConfig::default()
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = session::run(&opts, config, &mut out).and_then(|summary| {
        out.flush()?;
        Ok(summary)
    });

    match result {
        Ok(summary) => {
            tracing::info!(
                published = summary.published,
                signals = summary.signals,
                "done"
            );
        }
        Err(err) => {
            tracing::error!(%err, "demo failed");
            eprintln!("vlist-demo: {err}");
            process::exit(1);
        }
    }
}
