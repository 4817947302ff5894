//! Composition root and batch operations.
//!
//! `SyncEngine` wires the caches, lister, and transfer components around a
//! single explicit remote handle, then exposes the operator-facing `get`
//! and `put` operations, including their recursive batch forms. Within a
//! batch every item succeeds or fails on its own; cancellation is observed
//! between items.

use crate::cache::{LocalHashCache, RemoteHashCache};
use crate::cancel::CancelToken;
use crate::error::{Result, SyncError};
use crate::remote::{Progress, RemoteDrive};
use crate::store::Persistence;
use crate::transfer::{Downloader, TargetKind, TransferOutcome, Uploader};
use crate::tree::{FolderCreator, NodeLister};
use crate::types::{split_remote_path, NodeIdentity, RemoteNode};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use walkdir::WalkDir;

/// Flags shared by `get` and `put`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub overwrite: bool,
    pub recursive: bool,
}

/// Per-batch tally of item outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub up_to_date: usize,
    pub conflicts: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Completed => self.completed += 1,
            TransferOutcome::UpToDate => self.up_to_date += 1,
            TransferOutcome::Conflict => self.conflicts += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.up_to_date + self.conflicts + self.failed
    }
}

pub struct SyncEngine {
    lister: Arc<NodeLister>,
    folders: Arc<FolderCreator>,
    downloader: Arc<Downloader>,
    uploader: Arc<Uploader>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteDrive>, persistence: &Persistence) -> Result<Self> {
        let local_hashes = Arc::new(LocalHashCache::new(persistence)?);
        let remote_hashes = Arc::new(RemoteHashCache::new(persistence)?);
        let lister = Arc::new(NodeLister::new(Arc::clone(&remote)));
        let folders = Arc::new(FolderCreator::new(Arc::clone(&remote), Arc::clone(&lister)));
        let downloader = Arc::new(Downloader::new(
            Arc::clone(&remote),
            Arc::clone(&local_hashes),
            Arc::clone(&remote_hashes),
        ));
        let uploader = Arc::new(Uploader::new(
            remote,
            local_hashes,
            Arc::clone(&downloader),
            Arc::clone(&lister),
            Arc::clone(&folders),
        ));
        Ok(Self {
            lister,
            folders,
            downloader,
            uploader,
        })
    }

    /// Resolve a logical path to a node, from the main root by default.
    pub async fn resolve(
        &self,
        start: Option<&NodeIdentity>,
        target: &[String],
    ) -> Result<Option<RemoteNode>> {
        self.lister.resolve(start, target).await
    }

    /// Resolve a folder path, creating any missing folder along the way.
    pub async fn resolve_or_create_folders(
        &self,
        start: Option<&NodeIdentity>,
        target: &[String],
    ) -> Result<RemoteNode> {
        self.folders.find_or_create_folders(start, target).await
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    /// Download a remote path to a local destination.
    ///
    /// A file downloads as one item (into `dest/<name>` when `dest` is an
    /// existing directory). A folder requires `recursive` and walks the
    /// whole subtree, mirroring it under `dest`.
    pub async fn get(
        &self,
        remote_path: &str,
        dest: &Path,
        options: SyncOptions,
        cancel: &CancelToken,
        on_progress: Progress<'_>,
    ) -> Result<BatchReport> {
        let segments = split_remote_path(remote_path);
        let node = self
            .lister
            .resolve(None, &segments)
            .await?
            .ok_or_else(|| SyncError::RemoteNotFound(remote_path.to_string()))?;

        let mut report = BatchReport::default();
        match node {
            RemoteNode::File(file) => {
                let dest = if dest.is_dir() {
                    dest.join(&file.name)
                } else {
                    dest.to_path_buf()
                };
                let outcome = self
                    .downloader
                    .download_node(&file, None, &dest, options.overwrite, cancel, on_progress)
                    .await?;
                report.record(outcome);
            }
            RemoteNode::Folder(folder) => {
                if !options.recursive {
                    return Err(SyncError::NotAFile(format!(
                        "{remote_path} is not a file (pass --recursive to download folders)"
                    )));
                }
                let mut walk = self.lister.walk(&folder.identity, Box::new(|_, _| true));
                while let Some((path, node)) = walk.next().await? {
                    cancel.check()?;
                    let file = match node {
                        RemoteNode::File(file) => file,
                        RemoteNode::Folder(_) => continue,
                    };
                    let mut full_dest = dest.to_path_buf();
                    for segment in &path {
                        full_dest.push(segment);
                    }
                    if let Some(parent) = full_dest.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let item = path.join("/");
                    info!(src = %item, dest = %full_dest.display(), "downloading");
                    match self
                        .downloader
                        .download_node(
                            &file,
                            None,
                            &full_dest,
                            options.overwrite,
                            cancel,
                            on_progress,
                        )
                        .await
                    {
                        Ok(outcome) => report.record(outcome),
                        Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                        Err(e) => {
                            error!(item = %item, error = %e, "download failed");
                            report.failed += 1;
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// Upload a local path to a remote destination.
    ///
    /// A file uploads as one item; a trailing `/` on the remote path forces
    /// folder-target semantics, otherwise the kind is inferred. A directory
    /// requires `recursive` and uploads every file under it, keyed by its
    /// relative path.
    pub async fn put(
        &self,
        src: &Path,
        remote_path: &str,
        options: SyncOptions,
        cancel: &CancelToken,
        on_progress: Progress<'_>,
    ) -> Result<BatchReport> {
        let segments = split_remote_path(remote_path);
        let mut report = BatchReport::default();

        if src.is_file() {
            let kind = if remote_path.ends_with('/') {
                TargetKind::Folder
            } else {
                TargetKind::Unspecified
            };
            let outcome = self
                .uploader
                .upload_node(
                    None,
                    src,
                    &segments,
                    kind,
                    options.overwrite,
                    cancel,
                    on_progress,
                )
                .await?;
            report.record(outcome);
            return Ok(report);
        }

        if !src.is_dir() {
            return Err(SyncError::NotFound(src.to_path_buf()));
        }
        if !options.recursive {
            return Err(SyncError::NotAFile(format!(
                "{} is not a file (pass --recursive to upload directories)",
                src.display()
            )));
        }

        for entry in WalkDir::new(src).follow_links(false) {
            cancel.check()?;
            let entry = entry.map_err(|e| SyncError::Remote(format!("walk {}: {e}", src.display())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(src).map_err(|_| {
                SyncError::InvariantViolation(format!(
                    "walked path escapes source root: {}",
                    entry.path().display()
                ))
            })?;

            let mut full_target = segments.clone();
            for component in relative.components() {
                full_target.push(component.as_os_str().to_string_lossy().into_owned());
            }
            let item = full_target.join("/");
            info!(src = %entry.path().display(), dest = %item, "uploading");
            match self
                .uploader
                .upload_node(
                    None,
                    entry.path(),
                    &full_target,
                    TargetKind::File,
                    options.overwrite,
                    cancel,
                    on_progress,
                )
                .await
            {
                Ok(outcome) => report.record(outcome),
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    error!(item = %item, error = %e, "upload failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
