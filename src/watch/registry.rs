use std::path::{Path, PathBuf};
use std::time::Instant;

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashMap;

/// Per-directory subscription primitive.
///
/// Subscriptions are non-recursive; recursion comes from registering every
/// subdirectory on its own.
pub trait WatchBackend {
    fn watch(&mut self, path: &Path) -> notify::Result<()>;
    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;
}

impl<W: Watcher> WatchBackend for W {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        Watcher::watch(self, path, RecursiveMode::NonRecursive)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        Watcher::unwatch(self, path)
    }
}

/// Bookkeeping for a directory with an active subscription.
#[derive(Debug, Clone)]
pub struct WatchedDirectory {
    pub attached_at: Instant,
}

/// Set of currently watched directories.
///
/// Invariant: each discovered directory has exactly one entry, and removing a
/// path also removes every entry nested under it.
pub struct WatchRegistry<B> {
    backend: B,
    dirs: FxHashMap<PathBuf, WatchedDirectory>,
}

impl<B: WatchBackend> WatchRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            dirs: FxHashMap::default(),
        }
    }

    /// Register the configured root and every directory below it.
    ///
    /// Unlike `add`, the root itself may be a symlink to a directory. Links
    /// found below it are still skipped.
    pub fn add_root(&mut self, root: &Path) -> usize {
        if !root.is_dir() {
            return 0;
        }
        self.walk(root.to_path_buf(), true)
    }

    /// Register `path` and every directory below it.
    ///
    /// Non-directories, symlinks and already registered paths are skipped.
    /// A directory the backend refuses (e.g. permissions) is left unwatched
    /// along with its subtree. Returns the number of newly watched directories.
    pub fn add(&mut self, path: &Path) -> usize {
        self.walk(path.to_path_buf(), false)
    }

    fn walk(&mut self, start: PathBuf, trusted_start: bool) -> usize {
        let mut pending = vec![(start, trusted_start)];
        let mut added = 0;

        while let Some((dir, trusted)) = pending.pop() {
            if self.dirs.contains_key(&dir) || !(trusted || is_real_dir(&dir)) {
                continue;
            }

            if let Err(e) = self.backend.watch(&dir) {
                crate::debug!("watch"; "cannot watch {}: {}", dir.display(), e);
                continue;
            }

            crate::debug!("watch"; "attached: {}", dir.display());
            self.dirs.insert(
                dir.clone(),
                WatchedDirectory {
                    attached_at: Instant::now(),
                },
            );
            added += 1;

            // Listing is non-recursive; children are queued for their own add.
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    pending.push((entry.path(), false));
                }
            }
        }

        added
    }

    /// Cancel and drop `prefix` and every registered path nested under it.
    ///
    /// Matching is per path component, so removing `lib/api` keeps `lib/api_v2`.
    /// Returns the number of removed entries.
    pub fn remove(&mut self, prefix: &Path) -> usize {
        let stale: Vec<PathBuf> = self
            .dirs
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();

        for path in &stale {
            // The OS usually drops the watch of a deleted directory itself
            if let Err(e) = self.backend.unwatch(path) {
                crate::debug!("watch"; "unwatch {}: {}", path.display(), e);
            }
            if let Some(dir) = self.dirs.remove(path) {
                crate::debug!("watch"; "detached: {} (watched {:?})", path.display(), dir.attached_at.elapsed());
            }
        }

        stale.len()
    }

    #[cfg(test)]
    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<&WatchedDirectory> {
        self.dirs.get(path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Registered paths in sorted order.
    #[cfg(test)]
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<_> = self.dirs.keys().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Directory check that does not follow symlinks.
fn is_real_dir(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}
