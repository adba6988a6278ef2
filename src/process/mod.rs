//! Supervised server process.
//!
//! - `supervisor` - start / stop / restart of the single server instance
//! - `output` - Latin-1 forwarding of the child's stdout and stderr

mod output;
mod supervisor;

pub use supervisor::ProcessSupervisor;
