use std::time::{Duration, Instant};

pub(crate) const DEBOUNCE_MS: u64 = 500;

/// Timestamps of the last accepted restart and the last creation.
///
/// `None` means "never", which always passes the gate. Both fields only
/// move forward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RestartState {
    pub(crate) last_restart_at: Option<Instant>,
    pub(crate) last_create_at: Option<Instant>,
}

/// Decides whether a modification should restart the server.
///
/// A restart is accepted iff both the last restart and the last creation are
/// more than `delay` in the past. The create guard is a global time window,
/// not per file: an editor that creates an empty file fires an immediate
/// modify, and any modify inside that window is treated as part of the
/// creation.
pub(crate) struct DebounceGate {
    delay: Duration,
    state: RestartState,
}

impl DebounceGate {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: RestartState::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RestartState {
        self.state
    }

    pub(crate) fn record_create(&mut self, now: Instant) {
        advance(&mut self.state.last_create_at, now);
    }

    /// Accept or suppress a restart at `now`.
    ///
    /// On acceptance `last_restart_at` is stamped before the caller performs
    /// the restart, so notifications arriving during stop/start are suppressed.
    pub(crate) fn try_accept(&mut self, now: Instant) -> bool {
        if !self.elapsed(self.state.last_restart_at, now)
            || !self.elapsed(self.state.last_create_at, now)
        {
            return false;
        }

        advance(&mut self.state.last_restart_at, now);
        true
    }

    fn elapsed(&self, since: Option<Instant>, now: Instant) -> bool {
        since.is_none_or(|t| now.saturating_duration_since(t) > self.delay)
    }
}

fn advance(slot: &mut Option<Instant>, now: Instant) {
    if slot.is_none_or(|t| now > t) {
        *slot = Some(now);
    }
}
