use std::path::{Path, PathBuf};

/// What happened on a watched directory, after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    /// A file or directory appeared.
    Created(PathBuf),
    /// File contents changed.
    Modified(PathBuf),
    /// An entity was renamed into `to`. `from` is known only when the
    /// platform reports both ends of the rename.
    Moved { from: Option<PathBuf>, to: PathBuf },
    /// A file or directory disappeared.
    Deleted(PathBuf),
}

impl FsEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Modified(_) => "modified",
            Self::Moved { .. } => "moved",
            Self::Deleted(_) => "deleted",
        }
    }

    /// The path the event is about (destination for moves).
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
            Self::Moved { to, .. } => to,
        }
    }
}
