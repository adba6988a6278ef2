use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::classifier::EventClassifier;
use super::debouncer::{DEBOUNCE_MS, DebounceGate};
use super::registry::{WatchBackend, WatchRegistry};
use super::router::route_event;
use super::types::FsEvent;

/// Backend that records subscriptions instead of talking to the OS.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub(crate) watched: Vec<PathBuf>,
    pub(crate) unwatched: Vec<PathBuf>,
    /// Paths that fail to attach (simulates permission errors)
    pub(crate) deny: Vec<PathBuf>,
}

impl WatchBackend for RecordingBackend {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        if self.deny.iter().any(|p| p == path) {
            return Err(notify::Error::generic("permission denied"));
        }
        self.watched.push(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        self.unwatched.push(path.to_path_buf());
        Ok(())
    }
}

pub(crate) fn make_event<P: AsRef<Path>>(paths: Vec<P>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        attrs: Default::default(),
    }
}

pub(crate) fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

pub(crate) fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::Any)
}

pub(crate) fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::Any)
}

fn rename_kind(mode: notify::event::RenameMode) -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Name(mode))
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn make_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("lib");
    std::fs::create_dir_all(lib.join("src/models")).unwrap();
    std::fs::create_dir_all(lib.join("routes")).unwrap();
    std::fs::write(lib.join("main.dart"), "void main() {}").unwrap();
    std::fs::write(lib.join("src/app.dart"), "").unwrap();
    temp
}

fn registry() -> WatchRegistry<RecordingBackend> {
    WatchRegistry::new(RecordingBackend::default())
}

// =============================================================================
// EventClassifier
// =============================================================================

#[test]
fn test_classify_by_kind() {
    let a = Path::new("/app/lib/a.dart");

    assert_eq!(
        EventClassifier::classify(&make_event(vec![a], create_kind())),
        [FsEvent::Created(a.into())]
    );
    assert_eq!(
        EventClassifier::classify(&make_event(vec![a], modify_kind())),
        [FsEvent::Modified(a.into())]
    );
    assert_eq!(
        EventClassifier::classify(&make_event(vec![a], remove_kind())),
        [FsEvent::Deleted(a.into())]
    );
}

#[test]
fn test_classify_ignores_noise() {
    let a = Path::new("/app/lib/a.dart");
    let metadata = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::Permissions,
    ));
    let access = notify::EventKind::Access(notify::event::AccessKind::Read);

    assert!(EventClassifier::classify(&make_event(vec![a], metadata)).is_empty());
    assert!(EventClassifier::classify(&make_event(vec![a], access)).is_empty());
    assert!(EventClassifier::classify(&make_event(vec![a], notify::EventKind::Other)).is_empty());
}

#[test]
fn test_classify_renames() {
    use notify::event::RenameMode;

    let from = Path::new("/app/lib/a.dart.tmp");
    let to = Path::new("/app/lib/a.dart");

    assert_eq!(
        EventClassifier::classify(&make_event(vec![from, to], rename_kind(RenameMode::Both))),
        [FsEvent::Moved {
            from: Some(from.into()),
            to: to.into()
        }]
    );
    assert_eq!(
        EventClassifier::classify(&make_event(vec![to], rename_kind(RenameMode::To))),
        [FsEvent::Moved {
            from: None,
            to: to.into()
        }]
    );
    assert_eq!(
        EventClassifier::classify(&make_event(vec![from], rename_kind(RenameMode::From))),
        [FsEvent::Deleted(from.into())]
    );
}

#[test]
fn test_classify_ambiguous_rename_by_existence() {
    let temp = make_tree();
    let existing = temp.path().join("lib/main.dart");
    let gone = temp.path().join("lib/old.dart");
    let kind = || rename_kind(notify::event::RenameMode::Any);

    assert_eq!(
        EventClassifier::classify(&make_event(vec![&existing], kind())),
        [FsEvent::Moved {
            from: None,
            to: existing.clone()
        }]
    );
    assert_eq!(
        EventClassifier::classify(&make_event(vec![&gone], kind())),
        [FsEvent::Deleted(gone.clone())]
    );
}

#[test]
fn test_classify_multiple_paths() {
    let a = Path::new("/app/lib/a.dart");
    let b = Path::new("/app/lib/b.dart");
    let events = EventClassifier::classify(&make_event(vec![a, b], modify_kind()));
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].path(), b);
}

// =============================================================================
// DebounceGate
// =============================================================================

#[test]
fn test_gate_accepts_first_restart() {
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    assert!(gate.try_accept(t0));
    assert_eq!(gate.state().last_restart_at, Some(t0));
}

#[test]
fn test_gate_burst_restarts_once() {
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    let accepted = (0..10)
        .map(|i| gate.try_accept(t0 + ms(i * 45)))
        .filter(|&ok| ok)
        .count();
    assert_eq!(accepted, 1);
}

#[test]
fn test_gate_window_is_exclusive() {
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    assert!(gate.try_accept(t0));
    // exactly `delay` later is still inside the window
    assert!(!gate.try_accept(t0 + ms(DEBOUNCE_MS)));
    assert!(gate.try_accept(t0 + ms(DEBOUNCE_MS + 1)));
}

#[test]
fn test_gate_create_suppresses_modify() {
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    gate.record_create(t0);
    assert!(!gate.try_accept(t0));
    assert!(!gate.try_accept(t0 + ms(300)));
    // rejected candidates do not move the restart stamp
    assert_eq!(gate.state().last_restart_at, None);
    assert!(gate.try_accept(t0 + ms(501)));
}

#[test]
fn test_gate_save_scenario() {
    // create a.dart at 0, save at 0, 600, 650, 700, 1300
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    gate.record_create(t0);
    let saves = [0, 600, 650, 700, 1300];
    let restarts: Vec<u64> = saves
        .into_iter()
        .filter(|&t| gate.try_accept(t0 + ms(t)))
        .collect();

    assert_eq!(restarts, [600, 1300]);
}

#[test]
fn test_gate_stamps_never_go_back() {
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    let t0 = Instant::now();

    gate.record_create(t0 + ms(100));
    gate.record_create(t0);
    assert_eq!(gate.state().last_create_at, Some(t0 + ms(100)));
}

// =============================================================================
// WatchRegistry
// =============================================================================

#[test]
fn test_registry_add_recursive() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();

    assert_eq!(registry.add(&lib), 4);
    let paths: Vec<PathBuf> = registry.paths().into_iter().map(Path::to_path_buf).collect();
    assert_eq!(
        paths,
        [
            lib.clone(),
            lib.join("routes"),
            lib.join("src"),
            lib.join("src/models"),
        ]
    );
    assert!(registry.get(&lib).is_some_and(|d| d.attached_at <= Instant::now()));
}

#[test]
fn test_registry_add_idempotent() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();

    registry.add(&lib);
    assert_eq!(registry.add(&lib), 0);
    assert_eq!(registry.add(&lib.join("src")), 0);

    // one subscription per directory
    assert_eq!(registry.backend().watched.len(), 4);
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_registry_rejects_files_and_missing() {
    let temp = make_tree();
    let mut registry = registry();

    assert_eq!(registry.add(&temp.path().join("lib/main.dart")), 0);
    assert_eq!(registry.add(&temp.path().join("lib/nope")), 0);
    assert!(registry.is_empty());
    assert!(registry.backend().watched.is_empty());
}

#[cfg(unix)]
#[test]
fn test_registry_does_not_follow_symlinks() {
    let temp = make_tree();
    let outside = temp.path().join("outside");
    std::fs::create_dir(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, temp.path().join("lib/linked")).unwrap();

    let mut registry = registry();
    registry.add(&temp.path().join("lib"));

    assert!(!registry.contains(&temp.path().join("lib/linked")));
    assert!(!registry.contains(&outside));
}

#[cfg(unix)]
#[test]
fn test_registry_root_may_be_a_symlink() {
    let temp = make_tree();
    let link = temp.path().join("lib_link");
    std::os::unix::fs::symlink(temp.path().join("lib"), &link).unwrap();
    std::os::unix::fs::symlink(temp.path().join("lib/routes"), temp.path().join("lib/src/alias"))
        .unwrap();

    let mut registry = registry();
    assert_eq!(registry.add(&link), 0);
    assert_eq!(registry.add_root(&link), 4);

    assert!(registry.contains(&link));
    assert!(registry.contains(&link.join("src/models")));
    // links below the root are still skipped
    assert!(!registry.contains(&link.join("src/alias")));
}

#[test]
fn test_registry_add_root_rejects_files_and_missing() {
    let temp = make_tree();
    let mut registry = registry();

    assert_eq!(registry.add_root(&temp.path().join("lib/main.dart")), 0);
    assert_eq!(registry.add_root(&temp.path().join("lib/nope")), 0);
    assert!(registry.is_empty());
}

#[test]
fn test_registry_attach_failure_skips_subtree() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = WatchRegistry::new(RecordingBackend {
        deny: vec![lib.join("src")],
        ..Default::default()
    });

    assert_eq!(registry.add(&lib), 2);
    assert!(registry.contains(&lib.join("routes")));
    assert!(!registry.contains(&lib.join("src")));
    assert!(!registry.contains(&lib.join("src/models")));
}

#[test]
fn test_registry_remove_nested() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    registry.add(&lib);

    assert_eq!(registry.remove(&lib.join("src")), 2);
    assert!(!registry.contains(&lib.join("src")));
    assert!(!registry.contains(&lib.join("src/models")));
    assert!(registry.contains(&lib.join("routes")));

    let mut unwatched = registry.backend().unwatched.clone();
    unwatched.sort();
    assert_eq!(unwatched, [lib.join("src"), lib.join("src/models")]);
}

#[test]
fn test_registry_remove_matches_components_not_substrings() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("lib");
    std::fs::create_dir_all(lib.join("api")).unwrap();
    std::fs::create_dir_all(lib.join("api_v2")).unwrap();

    let mut registry = registry();
    registry.add(&lib);

    assert_eq!(registry.remove(&lib.join("api")), 1);
    assert!(registry.contains(&lib.join("api_v2")));
}

#[test]
fn test_registry_remove_unknown_is_noop() {
    let temp = make_tree();
    let mut registry = registry();
    registry.add(&temp.path().join("lib"));

    assert_eq!(registry.remove(&temp.path().join("lib/main.dart")), 0);
    assert_eq!(registry.len(), 4);
    assert!(registry.backend().unwatched.is_empty());
}

// =============================================================================
// Routing
// =============================================================================

#[test]
fn test_route_created_directory_is_discovered() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    registry.add(&lib);

    let widgets = lib.join("widgets");
    std::fs::create_dir_all(widgets.join("buttons")).unwrap();

    let now = Instant::now();
    let trigger = route_event(FsEvent::Created(widgets.clone()), &mut registry, &mut gate, now);

    assert_eq!(trigger, None);
    assert!(registry.contains(&widgets));
    assert!(registry.contains(&widgets.join("buttons")));
    assert_eq!(gate.state().last_create_at, Some(now));
}

#[test]
fn test_route_created_file_is_not_registered() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    registry.add(&lib);

    let file = lib.join("a.dart");
    std::fs::write(&file, "").unwrap();

    let t0 = Instant::now();
    assert_eq!(route_event(FsEvent::Created(file.clone()), &mut registry, &mut gate, t0), None);
    assert!(!registry.contains(&file));

    // the modify fired by the empty-file creation is suppressed
    assert_eq!(route_event(FsEvent::Modified(file.clone()), &mut registry, &mut gate, t0), None);
    // a genuine later save restarts
    assert_eq!(
        route_event(FsEvent::Modified(file.clone()), &mut registry, &mut gate, t0 + ms(600)),
        Some(file)
    );
}

#[test]
fn test_route_deleted_directory_removes_subtree() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    registry.add(&lib);

    std::fs::remove_dir_all(lib.join("src")).unwrap();
    let trigger = route_event(
        FsEvent::Deleted(lib.join("src")),
        &mut registry,
        &mut gate,
        Instant::now(),
    );

    assert_eq!(trigger, None);
    assert_eq!(registry.len(), 2);
    assert!(!registry.contains(&lib.join("src/models")));
}

#[test]
fn test_route_moved_directory() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    registry.add(&lib);

    std::fs::rename(lib.join("src"), lib.join("core")).unwrap();
    let trigger = route_event(
        FsEvent::Moved {
            from: Some(lib.join("src")),
            to: lib.join("core"),
        },
        &mut registry,
        &mut gate,
        Instant::now(),
    );

    assert_eq!(trigger, Some(lib.join("core")));
    assert!(!registry.contains(&lib.join("src")));
    assert!(!registry.contains(&lib.join("src/models")));
    assert!(registry.contains(&lib.join("core")));
    assert!(registry.contains(&lib.join("core/models")));
}

#[test]
fn test_route_moved_file_restarts_once_per_window() {
    let temp = make_tree();
    let lib = temp.path().join("lib");
    let mut registry = registry();
    let mut gate = DebounceGate::new(ms(DEBOUNCE_MS));
    registry.add(&lib);

    // atomic save: inotify reports To and Both for the same rename
    let main = lib.join("main.dart");
    let t0 = Instant::now();
    let first = route_event(
        FsEvent::Moved {
            from: None,
            to: main.clone(),
        },
        &mut registry,
        &mut gate,
        t0,
    );
    let second = route_event(
        FsEvent::Moved {
            from: Some(lib.join("main.dart.tmp")),
            to: main.clone(),
        },
        &mut registry,
        &mut gate,
        t0 + ms(1),
    );

    assert_eq!(first, Some(main));
    assert_eq!(second, None);
    assert_eq!(registry.len(), 4);
}

// =============================================================================
// Real notify backend
// =============================================================================

/// Feed every pending notification through the pipeline until the stream is
/// quiet, returning the number of accepted restarts.
#[cfg(target_os = "linux")]
async fn drain<B: WatchBackend>(
    events: &mut super::EventRx,
    registry: &mut WatchRegistry<B>,
    gate: &mut DebounceGate,
) -> usize {
    let mut restarts = 0;
    while let Ok(Some((at, result))) = tokio::time::timeout(ms(300), events.recv()).await {
        let Ok(event) = result else { continue };
        for fs_event in EventClassifier::classify(&event) {
            if route_event(fs_event, registry, gate, at).is_some() {
                restarts += 1;
            }
        }
    }
    restarts
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_watcher_tracks_directory_lifecycle() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().canonicalize().unwrap().join("lib");
    std::fs::create_dir(&lib).unwrap();

    let (mut registry, mut events) = super::start_watcher().unwrap();
    let mut gate = DebounceGate::new(ms(100));
    assert_eq!(registry.add_root(&lib), 1);

    // new directory becomes watched
    let views = lib.join("views");
    std::fs::create_dir(&views).unwrap();
    assert_eq!(drain(&mut events, &mut registry, &mut gate).await, 0);
    assert!(registry.contains(&views));

    // events from the new directory arrive; the create window swallows the first write
    let page = views.join("page.dart");
    std::fs::write(&page, "a").unwrap();
    assert_eq!(drain(&mut events, &mut registry, &mut gate).await, 0);

    // a later save restarts once
    std::fs::write(&page, "b").unwrap();
    assert_eq!(drain(&mut events, &mut registry, &mut gate).await, 1);

    // deleted subtree is unsubscribed
    std::fs::remove_dir_all(&views).unwrap();
    drain(&mut events, &mut registry, &mut gate).await;
    assert!(!registry.contains(&views));
    assert!(registry.contains(&lib));
}
