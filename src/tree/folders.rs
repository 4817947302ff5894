//! Folder resolution and creation along a logical path.

use super::NodeLister;
use crate::error::Result;
use crate::remote::RemoteDrive;
use crate::types::{FolderNode, NodeIdentity, RemoteNode};
use std::sync::Arc;
use tracing::{debug, info};

pub struct FolderCreator {
    remote: Arc<dyn RemoteDrive>,
    lister: Arc<NodeLister>,
}

impl FolderCreator {
    pub fn new(remote: Arc<dyn RemoteDrive>, lister: Arc<NodeLister>) -> Self {
        Self { remote, lister }
    }

    /// Create a folder named `name` under `parent`, invalidating the
    /// parent's cached listing and backfilling the new node's share id.
    pub async fn create_folder(&self, parent: &NodeIdentity, name: &str) -> Result<RemoteNode> {
        info!(name, parent = %parent, "creating remote folder");
        let mut node = self.remote.create_folder(parent, name).await?;
        self.lister.invalidate(parent);
        node.identity_mut().backfill_share_from(parent);
        Ok(node)
    }

    /// Walk `target` segment by segment from `start` (main root when
    /// unset), creating any missing folder along the way. Callers strip the
    /// final segment first when it names a file.
    pub async fn find_or_create_folders(
        &self,
        start: Option<&NodeIdentity>,
        target: &[String],
    ) -> Result<RemoteNode> {
        let start = match start {
            Some(identity) => identity.clone(),
            None => self.remote.root().await?,
        };

        let mut current = RemoteNode::Folder(FolderNode::synthetic(start));
        for segment in target {
            let children = self.lister.list_children(current.identity()).await?;
            let found = children.into_iter().find(|child| child.name() == *segment);
            current = match found {
                Some(child) => {
                    debug!(name = %segment, "found existing child");
                    child
                }
                None => self.create_folder(current.identity(), segment).await?,
            };
        }
        Ok(current)
    }
}
