use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

use super::types::FsEvent;

/// Maps raw notify events onto the closed `FsEvent` variant.
///
/// Unrecognized kinds (access, metadata-only changes, `Any`/`Other`) yield
/// nothing. One raw event may carry several paths and so several results.
pub(crate) struct EventClassifier;

impl EventClassifier {
    pub(crate) fn classify(event: &notify::Event) -> Vec<FsEvent> {
        let paths = event.paths.iter().cloned();

        match event.kind {
            EventKind::Create(_) => paths.map(FsEvent::Created).collect(),
            EventKind::Remove(_) => paths.map(FsEvent::Deleted).collect(),
            EventKind::Modify(ModifyKind::Name(mode)) => Self::classify_rename(mode, event),
            // Ignore metadata-only changes (mtime/atime/chmod noise)
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => paths.map(FsEvent::Modified).collect(),
            _ => Vec::new(),
        }
    }

    /// Rename reporting differs per backend:
    /// - inotify: `From`, `To`, then `Both` with `[from, to]`
    /// - FSEvents/kqueue: `Any` with a single path, either end of the rename
    fn classify_rename(mode: RenameMode, event: &notify::Event) -> Vec<FsEvent> {
        match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to]) => vec![FsEvent::Moved {
                from: Some(from.clone()),
                to: to.clone(),
            }],
            (RenameMode::From, paths) => paths.iter().cloned().map(FsEvent::Deleted).collect(),
            (RenameMode::To, paths) => paths
                .iter()
                .map(|to| FsEvent::Moved {
                    from: None,
                    to: to.clone(),
                })
                .collect(),
            (_, paths) => paths
                .iter()
                .map(|path| {
                    if path.exists() {
                        FsEvent::Moved {
                            from: None,
                            to: path.clone(),
                        }
                    } else {
                        FsEvent::Deleted(path.clone())
                    }
                })
                .collect(),
        }
    }
}
