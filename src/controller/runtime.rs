use std::time::Duration;

use tokio::sync::mpsc;

use super::Controller;
use crate::watch::{EventRx, WatchBackend};

/// How often to check whether the server exited on its own.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

impl<B: WatchBackend> Controller<B> {
    /// Run until a shutdown notification arrives.
    ///
    /// Watch events, the exit poll and the shutdown signal are handled one at a
    /// time; shutdown wins when several are ready.
    pub async fn run(&mut self, mut events: EventRx, mut shutdown: mpsc::UnboundedReceiver<()>) {
        self.launch().await;

        let mut exit_poll = tokio::time::interval(EXIT_POLL_INTERVAL);
        exit_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                Some(()) = shutdown.recv() => {
                    crate::debug!("respawn"; "shutdown signal received");
                    break;
                }
                Some((at, result)) = events.recv() => match result {
                    Ok(event) => self.handle_event(&event, at).await,
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                },
                _ = exit_poll.tick() => self.report_exit(),
            }
        }

        self.terminate().await;
    }
}
