//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Restart a dev server whenever its source tree changes
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: respawn.toml, optional)
    #[arg(short = 'C', long, default_value = "respawn.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Watched source directory (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Debounce window in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Print watch and process lifecycle details
    #[arg(short, long)]
    pub verbose: bool,

    /// Server command to run instead of the configured one
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
