use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::output::{OutputSink, spawn_forwarder, stdout_sink};

/// One live server instance.
struct ServerProcess {
    child: Child,
    /// stdout and stderr forwarding subscriptions
    forwarders: Vec<JoinHandle<()>>,
    /// Set once the process has been seen exiting on its own
    exit_reported: bool,
}

/// Owns the supervised server and its lifecycle.
///
/// At most one server exists at a time; `restart` fully stops the previous
/// instance (forwarders cancelled, process killed) before launching the next.
pub struct ProcessSupervisor {
    command: Vec<String>,
    cwd: PathBuf,
    sink: OutputSink,
    server: Option<ServerProcess>,
}

impl ProcessSupervisor {
    pub fn new(command: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command,
            cwd: cwd.into(),
            sink: stdout_sink(),
            server: None,
        }
    }

    /// Forward child output somewhere other than stdout.
    #[cfg(test)]
    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// OS process id of the current server.
    #[cfg(test)]
    pub fn pid(&self) -> Option<u32> {
        self.server.as_ref().and_then(|s| s.child.id())
    }

    /// Launch the server and start forwarding its output.
    ///
    /// A server that is still running is stopped first.
    pub async fn start(&mut self) -> Result<()> {
        self.stop().await;

        let Some((program, args)) = self.command.split_first() else {
            bail!("server command is empty");
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start `{program}`"))?;

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(spawn_forwarder("stdout", stdout, self.sink.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(spawn_forwarder("stderr", stderr, self.sink.clone()));
        }

        crate::debug!("server"; "started `{}` (pid {})", program, child.id().unwrap_or_default());
        self.server = Some(ServerProcess {
            child,
            forwarders,
            exit_reported: false,
        });
        Ok(())
    }

    /// Stop the server if one is running.
    ///
    /// Forwarders are cancelled and awaited before the process is killed.
    pub async fn stop(&mut self) {
        let Some(mut server) = self.server.take() else {
            return;
        };

        for forwarder in &server.forwarders {
            forwarder.abort();
        }
        for forwarder in server.forwarders.drain(..) {
            let _ = forwarder.await;
        }

        // Fails harmlessly when the process already exited
        if let Err(e) = server.child.kill().await {
            crate::debug!("server"; "kill: {}", e);
        }
        crate::debug!("server"; "stopped");
    }

    /// Stop then start, as one accepted restart.
    pub async fn restart(&mut self, trigger: Option<&Path>) -> Result<()> {
        if let Some(path) = trigger {
            crate::debug!("server"; "restart triggered by {}", path.display());
        }
        self.stop().await;
        self.start().await
    }

    /// Report a server that exited on its own, once per instance.
    pub fn poll_exit(&mut self) -> Option<ExitStatus> {
        let server = self.server.as_mut()?;
        if server.exit_reported {
            return None;
        }

        match server.child.try_wait() {
            Ok(Some(status)) => {
                server.exit_reported = true;
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                crate::debug!("server"; "status check failed: {}", e);
                None
            }
        }
    }
}
