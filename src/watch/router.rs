use std::path::PathBuf;
use std::time::Instant;

use super::debouncer::DebounceGate;
use super::registry::{WatchBackend, WatchRegistry};
use super::types::FsEvent;

/// Route one classified event.
///
/// Creations and deletions mutate the registry; modifications and moves are
/// restart candidates. Returns the triggering path when the gate accepts a
/// restart.
pub(crate) fn route_event<B: WatchBackend>(
    event: FsEvent,
    registry: &mut WatchRegistry<B>,
    gate: &mut DebounceGate,
    now: Instant,
) -> Option<PathBuf> {
    crate::debug!("watch"; "{}: {}", event.label(), event.path().display());

    match event {
        FsEvent::Created(path) => {
            gate.record_create(now);
            // Files are rejected by the registry's directory check
            registry.add(&path);
            None
        }
        FsEvent::Modified(path) => accept(gate, now, path),
        FsEvent::Moved { from, to } => {
            if let Some(from) = from {
                registry.remove(&from);
            }
            registry.add(&to);
            accept(gate, now, to)
        }
        FsEvent::Deleted(path) => {
            registry.remove(&path);
            None
        }
    }
}

fn accept(gate: &mut DebounceGate, now: Instant, path: PathBuf) -> Option<PathBuf> {
    if gate.try_accept(now) {
        Some(path)
    } else {
        crate::debug!("watch"; "suppressed: {}", path.display());
        None
    }
}
