//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! root = "lib"        # Source tree to watch (relative to project root)
//! delay_ms = 500      # Debounce window for restarts
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::ConfigDiagnostics;

/// File watching settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watched source tree.
    pub root: PathBuf,

    /// Debounce window in milliseconds.
    pub delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("lib"),
            delay_ms: crate::watch::DEBOUNCE_MS,
        }
    }
}

impl WatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub(crate) fn validate(&self, project_root: &Path, diag: &mut ConfigDiagnostics) {
        if self.delay_ms == 0 {
            diag.error("watch.delay_ms", "must be greater than 0");
        }

        let root = project_root.join(&self.root);
        if !root.is_dir() {
            diag.error_with_hint(
                "watch.root",
                format!("`{}` is not a directory", root.display()),
                "run from the project root or set watch.root / --root",
            );
        }
    }
}
