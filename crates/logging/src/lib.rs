#![warn(missing_docs)]

//! Shared logging setup and CLI argument definitions for the keybridge
//! workspace.
//!
//! All binaries flatten [`LogArgs`] into their clap parser and call
//! [`init`] once at startup. Filter specs are scoped to our own crates so
//! raising the level does not drown the logs in dependency noise.

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "keybridge_engine=trace,mac_hook=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        "keybridge",
        "keybridge_engine",
        "mac_hook",
        "mac_focus",
        "synthkey",
        "keyspec",
        "config",
        "permissions",
        "eventmark",
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our
/// crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    let parts: Vec<String> = our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect();
    parts.join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(args: &LogArgs) -> String {
    if let Some(spec) = &args.log_filter {
        return spec.clone();
    }
    if args.trace {
        return level_spec_for("trace");
    }
    if args.debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = &args.log_level {
        return level_spec_for(lvl);
    }
    if let Ok(spec) = env::var("RUST_LOG") {
        return spec;
    }
    level_spec_for("info")
}

/// Install the global tracing subscriber according to `args`.
///
/// Safe to call once per process; later calls are ignored (the first
/// subscriber wins), which keeps tests that each call this from panicking.
pub fn init(args: &LogArgs) {
    let filter = EnvFilter::new(compute_spec(args));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
