//! Keybridge: keep one application's shortcuts while working in another.
//!
//! Loads the configuration documents, brings up the engine, and runs until
//! interrupted. The tray menu and configuration editor live in a separate
//! process; this binary is the interception core only.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use keybridge_engine::Engine;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "keybridge", about = "Focus-aware shortcut translator", version)]
struct Cli {
    /// Config directory holding catalog.json and settings.json
    /// (default: ~/.keybridge)
    #[arg(long, value_name = "DIR")]
    config: Option<PathBuf>,

    /// Local port the browser extension reports web focus on
    #[arg(long, default_value_t = mac_focus::web::DEFAULT_PORT)]
    web_port: u16,

    #[command(flatten)]
    logs: logging::LogArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.logs);

    let preflight = permissions::Preflight::check();
    if !preflight.all_granted() {
        warn!(
            accessibility = preflight.accessibility,
            input_monitoring = preflight.input_monitoring,
            "missing permissions; remapping will be degraded until granted in System Settings"
        );
    }

    let dir = match config::resolve_config_dir(cli.config.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{}", e.pretty());
            return ExitCode::FAILURE;
        }
    };
    let docs = match config::Documents::load_from_dir(&dir) {
        Ok(docs) => docs,
        Err(e) => {
            eprintln!("{}", e.pretty());
            return ExitCode::FAILURE;
        }
    };

    let engine = Engine::new(docs, dir, cli.web_port);
    engine.register_hotkeys();
    engine.start();
    info!("keybridge running; press Ctrl-C to exit");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "signal_wait_failed");
    }
    engine.stop();
    ExitCode::SUCCESS
}
