//! Download decisions and execution.

use super::{TentativeFile, TransferOutcome};
use crate::cache::{LocalHashCache, RemoteHashCache};
use crate::cancel::CancelToken;
use crate::error::{Result, SyncError};
use crate::hasher::HashingWriter;
use crate::remote::{Progress, RemoteDrive, VerificationStatus};
use crate::store::mtime_secs;
use crate::types::{FileNode, Revision};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Downloader {
    remote: Arc<dyn RemoteDrive>,
    local_hashes: Arc<LocalHashCache>,
    remote_hashes: Arc<RemoteHashCache>,
}

impl Downloader {
    pub fn new(
        remote: Arc<dyn RemoteDrive>,
        local_hashes: Arc<LocalHashCache>,
        remote_hashes: Arc<RemoteHashCache>,
    ) -> Self {
        Self {
            remote,
            local_hashes,
            remote_hashes,
        }
    }

    /// The explicit revision, the node's active revision, or — with a
    /// warning — the newest entry of the full revision listing.
    async fn resolve_revision(
        &self,
        file: &FileNode,
        revision: Option<&Revision>,
    ) -> Result<Revision> {
        if let Some(revision) = revision {
            return Ok(revision.clone());
        }
        if let Some(active) = &file.active_revision {
            return Ok(active.clone());
        }
        warn!(file = %file.name, "no active revision, falling back to newest listed revision");
        let revisions = self.remote.file_revisions(&file.identity).await?;
        revisions
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::RemoteNotFound(format!("no revisions for {}", file.name)))
    }

    /// Download one revision of `file` to `dest`.
    ///
    /// Both hash caches are consulted first; an existing destination whose
    /// cache row is absent or stale is hashed on the spot, so the local
    /// side always has a hash when the file exists. A pair of matching
    /// hashes skips the transfer entirely and a mismatch without
    /// `overwrite` reports a conflict. Otherwise bytes stream through a
    /// hashing pass-through into a tentative sibling file, which is only
    /// renamed over the destination once the verdict and the hash
    /// comparisons allow it.
    pub async fn download_node(
        &self,
        file: &FileNode,
        revision: Option<&Revision>,
        dest: &Path,
        overwrite: bool,
        cancel: &CancelToken,
        on_progress: Progress<'_>,
    ) -> Result<TransferOutcome> {
        let dest = crate::cache::local::canonical_path(dest)?;
        let revision = self.resolve_revision(file, revision).await?;

        // Local side: fresh cache row, else hash the existing destination
        // and refresh the row. Only a missing destination is a true miss.
        let cached_local = match self.local_hashes.probe(&dest)? {
            Some(hash) => Some(hash),
            None if dest.exists() => Some(self.local_hashes.get_or_compute(&dest)?),
            None => None,
        };
        let cached_remote = self.remote_hashes.get(&file.identity, &revision.id)?;

        if let (Some(local), Some(remote)) = (&cached_local, &cached_remote) {
            if local == remote {
                info!(hash = %local, dest = %dest.display(), "skipping download, hashes match");
                return Ok(TransferOutcome::UpToDate);
            }
            if !overwrite {
                warn!(dest = %dest.display(), %local, %remote, "skipping download due to conflict");
                return Ok(TransferOutcome::Conflict);
            }
        }

        let tentative = TentativeFile::create(&dest)?;
        let mut sink = HashingWriter::new(tentative);
        let verdict = self
            .remote
            .download(&file.identity, &revision, &mut sink, on_progress, cancel)
            .await?;
        if verdict != VerificationStatus::Ok {
            // Dropping the sink discards the tentative file.
            return Err(SyncError::Verification(format!(
                "{verdict:?} while downloading {}",
                dest.display()
            )));
        }

        let (tentative, hash) = sink.finalize();
        self.remote_hashes.put(&file.identity, &revision.id, &hash)?;

        if let Some(local) = &cached_local {
            if *local == hash {
                // The remote-hash probe missed but the content turned out
                // identical; keep the existing file.
                info!(hash = %hash, dest = %dest.display(), "skipping write, content already present");
                return Ok(TransferOutcome::UpToDate);
            }
            if !overwrite {
                warn!(dest = %dest.display(), local = %local, remote = %hash, "skipping write due to conflict");
                return Ok(TransferOutcome::Conflict);
            }
            warn!(dest = %dest.display(), "overwriting");
        }

        tentative.commit(overwrite)?;
        let metadata = std::fs::metadata(&dest)?;
        self.local_hashes.put(&dest, mtime_secs(&metadata)?, &hash)?;
        Ok(TransferOutcome::Completed)
    }

    /// Content hash of one revision of `file`.
    ///
    /// Served from the remote hash cache when possible; otherwise the
    /// revision is downloaded into a null sink purely to learn (and cache)
    /// its hash. No bytes are persisted locally.
    pub async fn node_hash(
        &self,
        file: &FileNode,
        revision: Option<&Revision>,
        cancel: &CancelToken,
    ) -> Result<String> {
        let revision = self.resolve_revision(file, revision).await?;

        if let Some(hash) = self.remote_hashes.get(&file.identity, &revision.id)? {
            return Ok(hash);
        }

        let mut sink = HashingWriter::new(std::io::sink());
        let verdict = self
            .remote
            .download(&file.identity, &revision, &mut sink, &|_, _| {}, cancel)
            .await?;
        if verdict != VerificationStatus::Ok {
            return Err(SyncError::Verification(format!(
                "{verdict:?} while hashing {}",
                file.name
            )));
        }

        let (_, hash) = sink.finalize();
        self.remote_hashes.put(&file.identity, &revision.id, &hash)?;
        Ok(hash)
    }
}
