//! `[server]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [server]
//! command = ["dart", "bin/server.dart"]   # Program and arguments
//! ```
//!
//! The command runs with the project root as working directory.

use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigDiagnostics;

/// Supervised server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["dart".into(), "bin/server.dart".into()],
        }
    }
}

impl ServerConfig {
    /// Program to launch, empty when no command is set.
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn validate(&self, project_root: &Path, diag: &mut ConfigDiagnostics) {
        let program = self.program();
        if program.is_empty() {
            diag.error("server.command", "must not be empty");
            return;
        }

        // Launch failures surface on start, so a missing program is only a warning
        if which::which(program).is_err() && !project_root.join(program).is_file() {
            diag.warn("server.command", format!("`{program}` not found"));
        }
    }
}
