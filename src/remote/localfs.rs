//! Directory-backed implementation of [`RemoteDrive`].
//!
//! Maps a local directory onto the share/volume/node model: node ids are
//! slash-separated paths relative to the backing root, and each file exposes
//! a single active revision derived from its modification time and size.
//! This backend powers the CLI against a second directory and gives the
//! integration tests a real collaborator without any wire protocol.

use super::{Progress, RemoteDrive, VerificationStatus};
use crate::cancel::CancelToken;
use crate::error::{Result, SyncError};
use crate::store::mtime_secs;
use crate::types::{
    FileNode, FolderNode, NodeId, NodeIdentity, NodeState, RemoteNode, Revision, ShareId, VolumeId,
};
use async_trait::async_trait;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

pub struct LocalFsDrive {
    root: PathBuf,
    share: ShareId,
    volume: VolumeId,
}

impl LocalFsDrive {
    /// Open a backend over an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = dunce::canonicalize(&root).map_err(|_| SyncError::NotFound(root.clone()))?;
        if !root.is_dir() {
            return Err(SyncError::Config(format!(
                "remote root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            share: ShareId::new("local"),
            volume: VolumeId::new("local"),
        })
    }

    fn identity(&self, node: NodeId, with_share: bool) -> NodeIdentity {
        NodeIdentity {
            share_id: with_share.then(|| self.share.clone()),
            volume_id: self.volume.clone(),
            node_id: node,
        }
    }

    /// Filesystem path for a node id, rejecting ids that escape the root.
    fn path_of(&self, node: &NodeId) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in node.as_str().split('/').filter(|s| !s.is_empty()) {
            if segment == ".." || segment == "." {
                return Err(SyncError::InvariantViolation(format!(
                    "node id escapes the backing root: {node}"
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn child_id(parent: &NodeId, name: &str) -> NodeId {
        if parent.as_str().is_empty() {
            NodeId::new(name)
        } else {
            NodeId::new(format!("{}/{}", parent.as_str(), name))
        }
    }

    fn current_revision(path: &Path) -> Result<Revision> {
        let metadata = std::fs::metadata(path)?;
        Ok(Revision::new(format!(
            "{}-{}",
            mtime_secs(&metadata)?,
            metadata.len()
        )))
    }

    /// Build a node for `path`. Children carry no share id; callers
    /// backfill it from the parent, just like a real remote.
    fn node_at(&self, id: NodeId, name: String, path: &Path, with_share: bool) -> Result<RemoteNode> {
        let identity = self.identity(id, with_share);
        if path.is_dir() {
            Ok(RemoteNode::Folder(FolderNode {
                identity,
                name,
                state: NodeState::Active,
            }))
        } else {
            Ok(RemoteNode::File(FileNode {
                identity,
                name,
                state: NodeState::Active,
                active_revision: Some(Self::current_revision(path)?),
            }))
        }
    }

    fn write_upload(
        dest: &Path,
        source: &mut (dyn Read + Send),
        on_progress: Progress<'_>,
        cancel: &CancelToken,
        replace: bool,
    ) -> Result<()> {
        let dir = dest.parent().ok_or_else(|| {
            SyncError::Remote(format!("upload target has no parent: {}", dest.display()))
        })?;
        let mut staged = tempfile::Builder::new()
            .prefix(".skiff-upload-")
            .tempfile_in(dir)?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            cancel.check()?;
            let n = source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            staged.write_all(&buf[..n])?;
            written += n as u64;
            on_progress(written, 0);
        }
        staged.flush()?;

        let result = if replace {
            staged.persist(dest).map(|_| ())
        } else {
            staged.persist_noclobber(dest).map(|_| ())
        };
        result.map_err(|e| SyncError::Io(e.error))
    }
}

#[async_trait]
impl RemoteDrive for LocalFsDrive {
    async fn root(&self) -> Result<NodeIdentity> {
        Ok(self.identity(NodeId::new(""), true))
    }

    async fn list_children(&self, folder: &NodeIdentity) -> Result<Vec<RemoteNode>> {
        let dir = self.path_of(&folder.node_id)?;
        let mut children = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let id = Self::child_id(&folder.node_id, &name);
            children.push(self.node_at(id, name, &entry.path(), false)?);
        }
        debug!(folder = %folder.node_id, count = children.len(), "listed children");
        Ok(children)
    }

    async fn download(
        &self,
        file: &NodeIdentity,
        _revision: &Revision,
        sink: &mut (dyn Write + Send),
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<VerificationStatus> {
        // Only the latest content exists on disk; historical revision ids
        // cannot be served by this backend.
        let path = self.path_of(&file.node_id)?;
        let mut source = File::open(&path).map_err(|_| SyncError::NotFound(path.clone()))?;
        let total = source.metadata()?.len();

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;
        loop {
            cancel.check()?;
            let n = source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])?;
            transferred += n as u64;
            on_progress(transferred, total);
        }
        sink.flush()?;
        Ok(VerificationStatus::Ok)
    }

    async fn upload_new_file(
        &self,
        parent: &NodeIdentity,
        name: &str,
        _media_type: &str,
        source: &mut (dyn Read + Send),
        _mtime: i64,
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<RemoteNode> {
        let id = Self::child_id(&parent.node_id, name);
        let dest = self.path_of(&id)?;
        Self::write_upload(&dest, source, on_progress, cancel, false)?;
        self.node_at(id, name.to_string(), &dest, false)
    }

    async fn upload_new_file_or_revision(
        &self,
        parent: &NodeIdentity,
        name: &str,
        _media_type: &str,
        source: &mut (dyn Read + Send),
        _mtime: i64,
        on_progress: Progress<'_>,
        cancel: &CancelToken,
    ) -> Result<RemoteNode> {
        let id = Self::child_id(&parent.node_id, name);
        let dest = self.path_of(&id)?;
        Self::write_upload(&dest, source, on_progress, cancel, true)?;
        self.node_at(id, name.to_string(), &dest, false)
    }

    async fn create_folder(&self, parent: &NodeIdentity, name: &str) -> Result<RemoteNode> {
        let id = Self::child_id(&parent.node_id, name);
        let dir = self.path_of(&id)?;
        std::fs::create_dir(&dir)
            .map_err(|e| SyncError::Remote(format!("create folder {name}: {e}")))?;
        self.node_at(id, name.to_string(), &dir, false)
    }

    async fn get_node(&self, _share: &ShareId, node: &NodeId) -> Result<RemoteNode> {
        let path = self.path_of(node)?;
        if !path.exists() {
            return Err(SyncError::RemoteNotFound(node.as_str().to_string()));
        }
        let name = node
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        self.node_at(node.clone(), name, &path, false)
    }

    async fn file_revisions(&self, file: &NodeIdentity) -> Result<Vec<Revision>> {
        let path = self.path_of(&file.node_id)?;
        if !path.is_file() {
            return Err(SyncError::RemoteNotFound(file.node_id.as_str().to_string()));
        }
        Ok(vec![Self::current_revision(&path)?])
    }
}
