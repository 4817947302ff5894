//! Identity and node types for the remote tree.
//!
//! Folders and files live in a share/volume namespace and are addressed by a
//! [`NodeIdentity`] triple of opaque identifiers. Nodes are a tagged sum type
//! so a single derived `Clone` gives callers a deep, independent copy.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifies a share within a volume.
    ShareId
);
opaque_id!(
    /// Identifies a volume.
    VolumeId
);
opaque_id!(
    /// Identifies a folder or file node within a share/volume.
    NodeId
);
opaque_id!(
    /// Identifies one immutable revision of a file node.
    RevisionId
);

/// Unique address of a node within the remote tree.
///
/// Equality is component-wise over all three identifiers. The share may be
/// absent on nodes freshly returned by the remote collaborator; callers
/// backfill it from the resolution context before the identity is used as a
/// cache key or stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub share_id: Option<ShareId>,
    pub volume_id: VolumeId,
    pub node_id: NodeId,
}

impl NodeIdentity {
    pub fn new(share_id: ShareId, volume_id: VolumeId, node_id: NodeId) -> Self {
        Self {
            share_id: Some(share_id),
            volume_id,
            node_id,
        }
    }

    /// The share component, which must have been backfilled by this point.
    pub fn share_id(&self) -> Result<&ShareId> {
        self.share_id.as_ref().ok_or_else(|| {
            SyncError::InvariantViolation(format!(
                "node identity {} used before its share id was backfilled",
                self.node_id
            ))
        })
    }

    /// Inherit the share component from `parent` when the remote omitted it.
    pub fn backfill_share_from(&mut self, parent: &NodeIdentity) {
        if self.share_id.is_none() {
            self.share_id = parent.share_id.clone();
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let share = self.share_id.as_ref().map(ShareId::as_str).unwrap_or("?");
        write!(f, "{}/{}/{}", share, self.volume_id, self.node_id)
    }
}

/// Lifecycle state of a remote node. Draft nodes are uploads that never
/// finalized and must not be treated as a valid upload result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Active,
    Draft,
}

/// One immutable revision of a file node, scoped to that node's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
}

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: RevisionId::new(id),
        }
    }
}

/// A folder in the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub identity: NodeIdentity,
    pub name: String,
    pub state: NodeState,
}

impl FolderNode {
    /// Synthetic folder standing in for a traversal start point.
    pub fn synthetic(identity: NodeIdentity) -> Self {
        Self {
            identity,
            name: String::new(),
            state: NodeState::Active,
        }
    }
}

/// A file in the remote tree. Historical revisions are enumerated through
/// the remote collaborator, not carried on the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub identity: NodeIdentity,
    pub name: String,
    pub state: NodeState,
    pub active_revision: Option<Revision>,
}

/// A remote node, polymorphic over folders and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteNode {
    Folder(FolderNode),
    File(FileNode),
}

impl RemoteNode {
    pub fn name(&self) -> &str {
        match self {
            RemoteNode::Folder(folder) => &folder.name,
            RemoteNode::File(file) => &file.name,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        match self {
            RemoteNode::Folder(folder) => &folder.identity,
            RemoteNode::File(file) => &file.identity,
        }
    }

    pub fn identity_mut(&mut self) -> &mut NodeIdentity {
        match self {
            RemoteNode::Folder(folder) => &mut folder.identity,
            RemoteNode::File(file) => &mut file.identity,
        }
    }

    pub fn state(&self) -> NodeState {
        match self {
            RemoteNode::Folder(folder) => folder.state,
            RemoteNode::File(file) => file.state,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, RemoteNode::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            RemoteNode::File(file) => Some(file),
            RemoteNode::Folder(_) => None,
        }
    }
}

/// Split a slash-separated logical path into its non-empty segments.
pub fn split_remote_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
