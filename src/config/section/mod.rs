//! Configuration section definitions.
//!
//! Each module corresponds to a section in `respawn.toml`:
//!
//! | Module   | TOML Section | Purpose                              |
//! |----------|--------------|--------------------------------------|
//! | `watch`  | `[watch]`    | Watched source tree, debounce window |
//! | `server` | `[server]`   | Supervised server command            |

mod server;
mod watch;

pub use server::ServerConfig;
pub use watch::WatchConfig;
