//! Source tree watching.
//!
//! Turns raw OS notifications into restart decisions:
//!
//! ```text
//! notify → EventClassifier → route_event ─┬→ WatchRegistry (create/delete)
//!                                          └→ DebounceGate → restart trigger
//! ```

use std::time::Instant;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

// Raw notify event -> FsEvent.
mod classifier;
// Restart timing policy.
mod debouncer;
// Directory subscriptions.
mod registry;
// FsEvent -> registry mutation or restart trigger.
mod router;
// Shared fs event types.
mod types;

#[cfg(test)]
pub(crate) mod tests;

pub(crate) use classifier::EventClassifier;
pub(crate) use debouncer::{DEBOUNCE_MS, DebounceGate};
pub use registry::{WatchBackend, WatchRegistry};
pub(crate) use router::route_event;

/// Raw notification stamped with its arrival time.
///
/// Stamping in the notify callback keeps debounce decisions independent of
/// how long the controller spends restarting.
pub type RawEvent = (Instant, notify::Result<notify::Event>);

/// Receiving end of the watcher's event stream.
pub type EventRx = mpsc::UnboundedReceiver<RawEvent>;

/// Create the OS watcher with an empty registry.
///
/// Nothing is watched until `WatchRegistry::add` is called.
pub fn start_watcher() -> notify::Result<(WatchRegistry<RecommendedWatcher>, EventRx)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let watcher = notify::recommended_watcher(move |res| {
        // Receiver dropped means the controller is gone
        let _ = tx.send((Instant::now(), res));
    })?;

    Ok((WatchRegistry::new(watcher), rx))
}
