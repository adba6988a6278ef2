//! Process-wide shutdown state.
//!
//! Ctrl+C is delivered through one global `ctrlc` handler. The controller
//! registers a channel sender; the handler turns the signal into a single
//! "terminate requested" notification on that channel.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the controller loop
static SHUTDOWN_TX: OnceLock<mpsc::UnboundedSender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: nothing to tear down, exit immediately
/// - After `register_shutdown()`: notify the controller, which stops the server
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        // A second Ctrl+C while shutting down is ignored
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            return;
        }

        match SHUTDOWN_TX.get() {
            Some(tx) if tx.send(()).is_ok() => {}
            _ => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the controller for graceful shutdown
///
/// Returns the receiving end of the termination notification.
pub fn register_shutdown() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = SHUTDOWN_TX.set(tx);
    rx
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
