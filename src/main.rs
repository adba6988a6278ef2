//! Respawn - restart a dev server whenever its source tree changes.

mod cli;
mod config;
mod controller;
mod core;
mod logger;
mod process;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::Config;
use controller::Controller;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Config::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(async {
        let (mut controller, events) = Controller::from_config(&config)?;
        let shutdown = core::register_shutdown();

        log!("respawn"; "running `{}` from {}", config.server.command.join(" "), config.get_root().display());
        controller.run(events, shutdown).await;
        anyhow::Ok(())
    })
}
