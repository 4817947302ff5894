//! End-to-end sync flows against a directory-backed remote drive.

use skiff::cancel::CancelToken;
use skiff::engine::{SyncEngine, SyncOptions};
use skiff::error::SyncError;
use skiff::remote::localfs::LocalFsDrive;
use skiff::remote::no_progress;
use skiff::store::Persistence;
use skiff::types::split_remote_path;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct Harness {
    remote_dir: TempDir,
    local_dir: TempDir,
    engine: SyncEngine,
    cancel: CancelToken,
}

fn harness() -> Harness {
    let remote_dir = tempfile::tempdir().unwrap();
    let local_dir = tempfile::tempdir().unwrap();
    let drive = Arc::new(LocalFsDrive::new(remote_dir.path()).unwrap());
    let persistence = Persistence::temporary().unwrap();
    let engine = SyncEngine::new(drive, &persistence).unwrap();
    Harness {
        remote_dir,
        local_dir,
        engine,
        cancel: CancelToken::new(),
    }
}

fn plain() -> SyncOptions {
    SyncOptions::default()
}

fn overwrite() -> SyncOptions {
    SyncOptions {
        overwrite: true,
        recursive: false,
    }
}

/// Push a file's mtime into the future so a content change is never masked
/// by same-second timestamp granularity.
fn bump_mtime(path: &Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(2))
        .unwrap();
}

#[tokio::test]
async fn put_then_get_roundtrip() {
    let h = harness();
    let src = h.local_dir.path().join("report.txt");
    std::fs::write(&src, b"quarterly numbers").unwrap();

    let report = h
        .engine
        .put(&src, "docs/report.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.total(), 1);
    assert_eq!(
        std::fs::read(h.remote_dir.path().join("docs/report.txt")).unwrap(),
        b"quarterly numbers"
    );

    let dest = h.local_dir.path().join("fetched.txt");
    let report = h
        .engine
        .get("docs/report.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"quarterly numbers");
}

#[tokio::test]
async fn getting_into_a_directory_keeps_the_remote_name() {
    let h = harness();
    let src = h.local_dir.path().join("notes.txt");
    std::fs::write(&src, b"notes").unwrap();
    h.engine
        .put(&src, "notes.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();

    let dest_dir = h.local_dir.path().join("inbox");
    std::fs::create_dir(&dest_dir).unwrap();
    h.engine
        .get("notes.txt", &dest_dir, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(std::fs::read(dest_dir.join("notes.txt")).unwrap(), b"notes");
}

#[tokio::test]
async fn repeat_get_is_served_from_the_caches() {
    let h = harness();
    let src = h.local_dir.path().join("a.txt");
    std::fs::write(&src, b"stable content").unwrap();
    h.engine
        .put(&src, "a.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();

    let dest = h.local_dir.path().join("out.txt");
    let first = h
        .engine
        .get("a.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(first.completed, 1);

    let second = h
        .engine
        .get("a.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(second.up_to_date, 1);
    assert_eq!(second.completed, 0);
    assert_eq!(std::fs::read(&dest).unwrap(), b"stable content");
}

#[tokio::test]
async fn changed_remote_conflicts_until_overwrite_is_allowed() {
    let h = harness();
    let src = h.local_dir.path().join("v1.txt");
    std::fs::write(&src, b"version one").unwrap();
    h.engine
        .put(&src, "doc.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();

    let dest = h.local_dir.path().join("doc.txt");
    h.engine
        .get("doc.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();

    // The remote moves on to different content of a different length.
    let src2 = h.local_dir.path().join("v2.txt");
    std::fs::write(&src2, b"version two, revised").unwrap();
    let pushed = h
        .engine
        .put(&src2, "doc.txt", overwrite(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(pushed.completed, 1);

    // Without overwrite the stale destination is reported, not replaced.
    let report = h
        .engine
        .get("doc.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.conflicts, 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"version one");

    let report = h
        .engine
        .get("doc.txt", &dest, overwrite(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"version two, revised");
}

#[tokio::test]
async fn existing_destination_with_cold_caches_is_a_conflict() {
    let h = harness();
    // Remote content appears out of band; nothing is cached yet.
    std::fs::write(h.remote_dir.path().join("doc.txt"), b"remote copy").unwrap();
    let dest = h.local_dir.path().join("doc.txt");
    std::fs::write(&dest, b"local edits, diverged").unwrap();

    let report = h
        .engine
        .get("doc.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.conflicts, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(std::fs::read(&dest).unwrap(), b"local edits, diverged");

    let report = h
        .engine
        .get("doc.txt", &dest, overwrite(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"remote copy");
}

#[tokio::test]
async fn identical_existing_destination_is_up_to_date() {
    let h = harness();
    std::fs::write(h.remote_dir.path().join("same.txt"), b"matching bytes").unwrap();
    let dest = h.local_dir.path().join("same.txt");
    std::fs::write(&dest, b"matching bytes").unwrap();

    let report = h
        .engine
        .get("same.txt", &dest, plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.up_to_date, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(std::fs::read(&dest).unwrap(), b"matching bytes");
}

#[tokio::test]
async fn upload_progress_carries_the_source_size() {
    let h = harness();
    let src = h.local_dir.path().join("blob.bin");
    let payload = vec![42u8; 100_000];
    std::fs::write(&src, &payload).unwrap();

    let events = std::sync::Mutex::new(Vec::new());
    let on_progress = &|transferred: u64, total: u64| {
        events.lock().unwrap().push((transferred, total));
    };
    h.engine
        .put(&src, "blob.bin", plain(), &h.cancel, on_progress)
        .await
        .unwrap();

    let events = events.into_inner().unwrap();
    assert!(!events.is_empty());
    let size = payload.len() as u64;
    assert!(events.iter().all(|(_, total)| *total == size));
    assert_eq!(events.last().unwrap().0, size);
}

#[tokio::test]
async fn unchanged_put_is_skipped() {
    let h = harness();
    let src = h.local_dir.path().join("same.txt");
    std::fs::write(&src, b"identical bytes").unwrap();

    h.engine
        .put(&src, "same.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    let second = h
        .engine
        .put(&src, "same.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(second.up_to_date, 1);
    assert_eq!(second.completed, 0);
}

#[tokio::test]
async fn changed_local_conflicts_until_overwrite_is_allowed() {
    let h = harness();
    let src = h.local_dir.path().join("draft.txt");
    std::fs::write(&src, b"first draft").unwrap();
    h.engine
        .put(&src, "draft.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();

    std::fs::write(&src, b"second draft, much longer").unwrap();
    bump_mtime(&src);

    let report = h
        .engine
        .put(&src, "draft.txt", plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.conflicts, 1);
    assert_eq!(
        std::fs::read(h.remote_dir.path().join("draft.txt")).unwrap(),
        b"first draft"
    );

    let report = h
        .engine
        .put(&src, "draft.txt", overwrite(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(
        std::fs::read(h.remote_dir.path().join("draft.txt")).unwrap(),
        b"second draft, much longer"
    );
}

#[tokio::test]
async fn recursive_put_and_get_mirror_a_tree() {
    let h = harness();
    let src_root = h.local_dir.path().join("project");
    std::fs::create_dir_all(src_root.join("sub")).unwrap();
    std::fs::write(src_root.join("a.txt"), b"alpha").unwrap();
    std::fs::write(src_root.join("sub/b.txt"), b"beta").unwrap();

    let options = SyncOptions {
        overwrite: false,
        recursive: true,
    };
    let report = h
        .engine
        .put(&src_root, "backup", options, &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 0);

    let dest_root = h.local_dir.path().join("restored");
    std::fs::create_dir(&dest_root).unwrap();
    let report = h
        .engine
        .get("backup", &dest_root, options, &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(std::fs::read(dest_root.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(dest_root.join("sub/b.txt")).unwrap(), b"beta");
}

#[tokio::test]
async fn folder_transfers_require_the_recursive_flag() {
    let h = harness();
    let src_root = h.local_dir.path().join("tree");
    std::fs::create_dir(&src_root).unwrap();
    std::fs::write(src_root.join("x.txt"), b"x").unwrap();

    let err = h
        .engine
        .put(&src_root, "tree", plain(), &h.cancel, no_progress())
        .await;
    assert!(matches!(err, Err(SyncError::NotAFile(_))));

    let options = SyncOptions {
        overwrite: false,
        recursive: true,
    };
    h.engine
        .put(&src_root, "tree", options, &h.cancel, no_progress())
        .await
        .unwrap();

    let dest = h.local_dir.path().join("pulled");
    std::fs::create_dir(&dest).unwrap();
    let err = h
        .engine
        .get("tree", &dest, plain(), &h.cancel, no_progress())
        .await;
    assert!(matches!(err, Err(SyncError::NotAFile(_))));
}

#[tokio::test]
async fn trailing_slash_uploads_into_a_folder() {
    let h = harness();
    let src = h.local_dir.path().join("photo.jpg");
    std::fs::write(&src, b"jpeg bytes").unwrap();

    h.engine
        .put(&src, "albums/summer/", plain(), &h.cancel, no_progress())
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(h.remote_dir.path().join("albums/summer/photo.jpg")).unwrap(),
        b"jpeg bytes"
    );
}

#[tokio::test]
async fn folder_creation_is_idempotent_through_the_engine() {
    let h = harness();
    let target = split_remote_path("a/b/c");

    let first = h
        .engine
        .resolve_or_create_folders(None, &target)
        .await
        .unwrap();
    let second = h
        .engine
        .resolve_or_create_folders(None, &target)
        .await
        .unwrap();
    assert_eq!(first.identity().node_id, second.identity().node_id);
    assert!(h.remote_dir.path().join("a/b/c").is_dir());

    let resolved = h.engine.resolve(None, &target).await.unwrap().unwrap();
    assert!(resolved.is_folder());
}

#[tokio::test]
async fn missing_remote_path_is_reported() {
    let h = harness();
    let dest = h.local_dir.path().join("nothing.txt");
    let err = h
        .engine
        .get("no/such/file.txt", &dest, plain(), &h.cancel, no_progress())
        .await;
    assert!(matches!(err, Err(SyncError::RemoteNotFound(_))));
}

#[tokio::test]
async fn cancelled_batch_stops_early() {
    let h = harness();
    let src_root = h.local_dir.path().join("bulk");
    std::fs::create_dir(&src_root).unwrap();
    std::fs::write(src_root.join("one.txt"), b"1").unwrap();
    std::fs::write(src_root.join("two.txt"), b"2").unwrap();

    h.cancel.cancel();
    let options = SyncOptions {
        overwrite: false,
        recursive: true,
    };
    let err = h
        .engine
        .put(&src_root, "bulk", options, &h.cancel, no_progress())
        .await;
    assert!(matches!(err, Err(SyncError::Cancelled)));
}
