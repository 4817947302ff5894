//! Memoized remote-tree listing and path resolution.
//!
//! `NodeLister` caches "children of folder X" per remote identity for the
//! lifetime of the process. Entries are dropped (never updated in place)
//! whenever a mutation targets that folder, and every node handed out is an
//! independent clone so caller mutation cannot corrupt the cached copy.
//! Two callers racing on an uncached folder may both hit the remote; the
//! second write simply replaces the first with an equivalent result.

pub mod folders;
pub mod walk;

pub use folders::FolderCreator;
pub use walk::{DescendFn, TreeWalk};

use crate::error::Result;
use crate::remote::RemoteDrive;
use crate::types::{FolderNode, NodeIdentity, RemoteNode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct NodeLister {
    remote: Arc<dyn RemoteDrive>,
    children: RwLock<HashMap<NodeIdentity, Arc<Vec<RemoteNode>>>>,
}

impl NodeLister {
    pub fn new(remote: Arc<dyn RemoteDrive>) -> Self {
        Self {
            remote,
            children: RwLock::new(HashMap::new()),
        }
    }

    /// Direct children of `folder`, memoized. Each returned node is a deep
    /// copy, with its share id backfilled from the parent where the remote
    /// omitted it.
    pub async fn list_children(&self, folder: &NodeIdentity) -> Result<Vec<RemoteNode>> {
        if let Some(cached) = self.children.read().get(folder) {
            return Ok(cached.as_ref().clone());
        }

        let mut fetched = self.remote.list_children(folder).await?;
        for child in &mut fetched {
            child.identity_mut().backfill_share_from(folder);
        }
        let fetched = Arc::new(fetched);
        self.children
            .write()
            .insert(folder.clone(), Arc::clone(&fetched));
        Ok(fetched.as_ref().clone())
    }

    /// Drop the memoized entry for `folder`. Must be called by any
    /// operation that mutates that folder's children.
    pub fn invalidate(&self, folder: &NodeIdentity) {
        if self.children.write().remove(folder).is_some() {
            debug!(folder = %folder, "invalidated cached folder listing");
        }
    }

    /// Depth-first pre-order traversal starting below `start`. For each
    /// child the walk yields the node, then recurses only where `descend`
    /// approves.
    pub fn walk(&self, start: &NodeIdentity, descend: DescendFn) -> TreeWalk<'_> {
        TreeWalk::new(self, start.clone(), descend)
    }

    /// Resolve a slash-split logical path to a node.
    ///
    /// Without a starting identity the main volume's root is used. An empty
    /// target resolves to a synthetic folder standing for the start itself.
    /// Otherwise the walk descends only along prefixes of the target and
    /// returns the first node whose accumulated path matches it exactly.
    pub async fn resolve(
        &self,
        start: Option<&NodeIdentity>,
        target: &[String],
    ) -> Result<Option<RemoteNode>> {
        let start = match start {
            Some(identity) => identity.clone(),
            None => self.remote.root().await?,
        };

        if target.is_empty() {
            return Ok(Some(RemoteNode::Folder(FolderNode::synthetic(start))));
        }

        let wanted = target.to_vec();
        let mut walk = self.walk(
            &start,
            Box::new(move |path, _| wanted.len() > path.len() && wanted[..path.len()] == path[..]),
        );
        while let Some((path, node)) = walk.next().await? {
            if path == target {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}
