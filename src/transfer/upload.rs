//! Upload decisions and execution.

use super::{Downloader, TargetKind, TransferOutcome, OCTET_STREAM};
use crate::cache::LocalHashCache;
use crate::cancel::CancelToken;
use crate::error::{Result, SyncError};
use crate::remote::{Progress, RemoteDrive};
use crate::store::mtime_secs;
use crate::tree::{FolderCreator, NodeLister};
use crate::types::{NodeIdentity, NodeState, RemoteNode};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Uploader {
    remote: Arc<dyn RemoteDrive>,
    local_hashes: Arc<LocalHashCache>,
    downloader: Arc<Downloader>,
    lister: Arc<NodeLister>,
    folders: Arc<FolderCreator>,
}

impl Uploader {
    pub fn new(
        remote: Arc<dyn RemoteDrive>,
        local_hashes: Arc<LocalHashCache>,
        downloader: Arc<Downloader>,
        lister: Arc<NodeLister>,
        folders: Arc<FolderCreator>,
    ) -> Self {
        Self {
            remote,
            local_hashes,
            downloader,
            lister,
            folders,
        }
    }

    fn base_name(src: &Path) -> Result<String> {
        src.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SyncError::InvariantViolation(format!(
                    "upload source has no base name: {}",
                    src.display()
                ))
            })
    }

    /// Upload `src` to a logical target path.
    ///
    /// A `Folder` target uploads into that folder under the source's base
    /// name; a `File` target treats the final segment as the destination
    /// name. `Unspecified` infers the kind by looking up the exact path:
    /// an existing folder means folder target, an existing file or nothing
    /// at all means file target.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_node(
        &self,
        start: Option<&NodeIdentity>,
        src: &Path,
        target: &[String],
        kind: TargetKind,
        overwrite: bool,
        cancel: &CancelToken,
        on_progress: Progress<'_>,
    ) -> Result<TransferOutcome> {
        let start = match start {
            Some(identity) => identity.clone(),
            None => self.remote.root().await?,
        };

        let folder_target = match kind {
            TargetKind::Folder => true,
            TargetKind::File => false,
            TargetKind::Unspecified => matches!(
                self.lister.resolve(Some(&start), target).await?,
                Some(node) if node.is_folder()
            ),
        };

        let (parent, dest_name) = if folder_target {
            let folder = self
                .folders
                .find_or_create_folders(Some(&start), target)
                .await?;
            (folder.identity().clone(), Self::base_name(src)?)
        } else {
            let (name, parents) = target.split_last().ok_or_else(|| {
                SyncError::InvariantViolation(
                    "file target requires at least one path segment".to_string(),
                )
            })?;
            let folder = self
                .folders
                .find_or_create_folders(Some(&start), parents)
                .await?;
            (folder.identity().clone(), name.clone())
        };

        self.upload_to_parent(src, &parent, &dest_name, overwrite, cancel, on_progress)
            .await
    }

    /// Upload `src` as `dest_name` directly under `parent`.
    ///
    /// The local hash decides everything up front: an existing remote node
    /// with the same hash skips the upload, a differing hash without
    /// `overwrite` is a conflict. After a performed upload the resulting
    /// node must have left draft state and its re-downloaded hash must
    /// equal the hash that was uploaded.
    pub async fn upload_to_parent(
        &self,
        src: &Path,
        parent: &NodeIdentity,
        dest_name: &str,
        overwrite: bool,
        cancel: &CancelToken,
        on_progress: Progress<'_>,
    ) -> Result<TransferOutcome> {
        let src = crate::cache::local::canonical_path(src)?;
        let local_hash = self.local_hashes.get_or_compute(&src)?;
        let metadata = std::fs::metadata(&src)?;
        let mtime = mtime_secs(&metadata)?;
        // The remote cannot size an opaque reader; report the known source
        // size as the total instead of whatever it guesses.
        let size = metadata.len();
        let sized_progress = |transferred: u64, _: u64| on_progress(transferred, size);

        let dest_segment = [dest_name.to_string()];
        let existing = self.lister.resolve(Some(parent), &dest_segment).await?;
        if let Some(existing) = &existing {
            let existing_file = existing
                .as_file()
                .ok_or_else(|| SyncError::NotAFile(dest_name.to_string()))?;
            let existing_hash = self.downloader.node_hash(existing_file, None, cancel).await?;
            if existing_hash == local_hash {
                info!(hash = %local_hash, dest = %dest_name, "skipping upload, hashes match");
                return Ok(TransferOutcome::UpToDate);
            }
            if !overwrite {
                warn!(dest = %dest_name, local = %local_hash, remote = %existing_hash, "skipping upload due to conflict");
                return Ok(TransferOutcome::Conflict);
            }
            warn!(dest = %dest_name, "overwriting");
        }

        let file = File::open(&src).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(src.clone())
            } else {
                SyncError::Io(e)
            }
        })?;
        let mut source = BufReader::new(file);

        let uploaded = if overwrite {
            self.remote
                .upload_new_file_or_revision(
                    parent,
                    dest_name,
                    OCTET_STREAM,
                    &mut source,
                    mtime,
                    &sized_progress,
                    cancel,
                )
                .await?
        } else {
            self.remote
                .upload_new_file(
                    parent,
                    dest_name,
                    OCTET_STREAM,
                    &mut source,
                    mtime,
                    &sized_progress,
                    cancel,
                )
                .await?
        };

        self.lister.invalidate(parent);

        // Re-fetch the node rather than trusting the upload response.
        let share = parent.share_id()?;
        let mut node = self
            .remote
            .get_node(share, &uploaded.identity().node_id)
            .await?;
        if node.state() == NodeState::Draft {
            return Err(SyncError::DraftState(src.display().to_string()));
        }
        node.identity_mut().backfill_share_from(parent);

        let file_node = match &node {
            RemoteNode::File(file) => file,
            RemoteNode::Folder(_) => return Err(SyncError::NotAFile(dest_name.to_string())),
        };
        let remote_hash = self.downloader.node_hash(file_node, None, cancel).await?;
        if remote_hash != local_hash {
            return Err(SyncError::IntegrityMismatch {
                path: src.display().to_string(),
                local: local_hash,
                remote: remote_hash,
            });
        }

        Ok(TransferOutcome::Completed)
    }
}
