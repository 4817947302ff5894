//! Interface to the remote object store.
//!
//! The wire protocol, encryption, and authentication all live behind this
//! trait; the sync engine only ever sees folders, files, revisions, and
//! byte streams. Every component takes the collaborator as an explicit
//! `Arc<dyn RemoteDrive>` handle.

pub mod localfs;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::types::{NodeId, NodeIdentity, RemoteNode, Revision, ShareId};
use async_trait::async_trait;
use std::io::{Read, Write};

/// Progress callback: (bytes transferred, total bytes).
pub type Progress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// No-op progress callback.
pub fn no_progress() -> Progress<'static> {
    &|_, _| {}
}

/// The remote collaborator's verdict on downloaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Ok,
    /// Bytes did not match what the remote claims was stored; treat as
    /// tampered or corrupt.
    Failed,
}

#[async_trait]
pub trait RemoteDrive: Send + Sync {
    /// Identity of the main volume's root folder.
    async fn root(&self) -> Result<NodeIdentity>;

    /// Direct children of a folder. Returned identities may lack a share
    /// id; the caller backfills it from the parent.
    async fn list_children(&self, folder: &NodeIdentity) -> Result<Vec<RemoteNode>>;

    /// Stream one revision's content into `sink`, reporting progress and
    /// observing cancellation between chunks. The verdict covers the
    /// authenticity of the streamed bytes.
    async fn download(
        &self,
        file: &NodeIdentity,
        revision: &Revision,
        sink: &mut (dyn Write + Send),
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<VerificationStatus>;

    /// Upload `source` as a brand new file under `parent`. Fails if a node
    /// named `name` already exists there.
    #[allow(clippy::too_many_arguments)]
    async fn upload_new_file(
        &self,
        parent: &NodeIdentity,
        name: &str,
        media_type: &str,
        source: &mut (dyn Read + Send),
        mtime: i64,
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<RemoteNode>;

    /// Upload `source` as a new file, or as a new revision when a node
    /// named `name` already exists under `parent`.
    #[allow(clippy::too_many_arguments)]
    async fn upload_new_file_or_revision(
        &self,
        parent: &NodeIdentity,
        name: &str,
        media_type: &str,
        source: &mut (dyn Read + Send),
        mtime: i64,
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<RemoteNode>;

    /// Create a folder named `name` under `parent`.
    async fn create_folder(&self, parent: &NodeIdentity, name: &str) -> Result<RemoteNode>;

    /// Fetch a node by id within a share.
    async fn get_node(&self, share: &ShareId, node: &NodeId) -> Result<RemoteNode>;

    /// All revisions of a file, newest first.
    async fn file_revisions(&self, file: &NodeIdentity) -> Result<Vec<Revision>>;
}
