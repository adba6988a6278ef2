//! Controller - wires the watch pipeline to the process supervisor.
//!
//! ```text
//! notify ─→ EventClassifier ─→ route_event ─→ DebounceGate ─→ ProcessSupervisor
//!                                  │
//!                                  └─→ WatchRegistry (create / delete)
//! ```
//!
//! All state (registry, restart timestamps, server handle) is owned here and
//! mutated only from the single event loop in `runtime`.

mod runtime;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use notify::RecommendedWatcher;

use crate::config::Config;
use crate::logger::{status_error, status_success};
use crate::process::ProcessSupervisor;
use crate::watch::{
    DebounceGate, EventClassifier, EventRx, WatchBackend, WatchRegistry, route_event,
    start_watcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Terminating,
}

pub struct Controller<B> {
    state: ControllerState,
    registry: WatchRegistry<B>,
    gate: DebounceGate,
    supervisor: ProcessSupervisor,
    project_root: PathBuf,
    watch_root: PathBuf,
    /// Accepted restarts that launched successfully
    restarts: usize,
}

impl Controller<RecommendedWatcher> {
    /// Build the controller and the OS watcher from configuration.
    pub fn from_config(config: &Config) -> Result<(Self, EventRx)> {
        let (registry, events) =
            start_watcher().map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        let supervisor = ProcessSupervisor::new(config.server.command.clone(), config.get_root());

        let controller = Self::new(
            registry,
            supervisor,
            DebounceGate::new(config.delay()),
            config.get_root(),
            config.watch_root(),
        );
        Ok((controller, events))
    }
}

impl<B: WatchBackend> Controller<B> {
    pub(crate) fn new(
        registry: WatchRegistry<B>,
        supervisor: ProcessSupervisor,
        gate: DebounceGate,
        project_root: impl Into<PathBuf>,
        watch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            state: ControllerState::Running,
            registry,
            gate,
            supervisor,
            project_root: project_root.into(),
            watch_root: watch_root.into(),
            restarts: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[cfg(test)]
    pub fn registry(&self) -> &WatchRegistry<B> {
        &self.registry
    }

    #[cfg(test)]
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    #[cfg(test)]
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Start the server, then watch the source tree.
    pub async fn launch(&mut self) {
        if let Err(e) = self.supervisor.start().await {
            status_error("server failed to start", &format!("{e:#}"));
        }

        let root = self.display_path(&self.watch_root);
        if self.registry.add_root(&self.watch_root) == 0 {
            crate::log!(
                "warning";
                "nothing to watch under {}, changes will not restart the server",
                root
            );
            return;
        }

        let count = self.registry.len();
        crate::log!(
            "watch";
            "watching {} ({} {})",
            root,
            count,
            if count == 1 { "directory" } else { "directories" }
        );
    }

    /// Handle one raw notification received at `at`.
    pub async fn handle_event(&mut self, event: &notify::Event, at: Instant) {
        for fs_event in EventClassifier::classify(event) {
            if self.state == ControllerState::Terminating || crate::core::is_shutdown() {
                return;
            }

            if let Some(trigger) = route_event(fs_event, &mut self.registry, &mut self.gate, at) {
                self.restart(&trigger).await;
            }
        }
    }

    async fn restart(&mut self, trigger: &Path) {
        let shown = self.display_path(trigger);
        match self.supervisor.restart(Some(trigger)).await {
            Ok(()) => {
                self.restarts += 1;
                status_success(&format!("restarted: {shown}"));
            }
            Err(e) => status_error(&format!("restart failed: {shown}"), &format!("{e:#}")),
        }
    }

    /// Log a server that exited without being asked to.
    pub fn report_exit(&mut self) {
        if let Some(status) = self.supervisor.poll_exit() {
            crate::log!("server"; "server exited ({}), waiting for changes", status);
        }
    }

    /// Stop the server and stop handling events.
    pub async fn terminate(&mut self) {
        self.state = ControllerState::Terminating;
        crate::log!("respawn"; "shutting down...");
        crate::debug!("respawn"; "{} restarts this session", self.restarts);
        self.supervisor.stop().await;
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
