//! Resumable depth-first traversal of the remote tree.
//!
//! Instead of unrestricted recursion, the walk keeps an explicit stack of
//! pending sibling cursors. Each `next` call yields exactly one node, so
//! callers can pause, cancel, or interleave work between yields, and a
//! depth guard bounds traversal if a buggy remote ever hands back a cycle.

use super::NodeLister;
use crate::error::{Result, SyncError};
use crate::types::{FolderNode, NodeIdentity, RemoteNode};

/// Decides whether the walk recurses into a folder it just yielded.
/// Receives the folder's accumulated path relative to the start.
pub type DescendFn = Box<dyn Fn(&[String], &FolderNode) -> bool + Send + Sync>;

/// Maximum folder nesting the walker will follow.
pub const MAX_DEPTH: usize = 128;

struct Frame {
    path: Vec<String>,
    children: std::vec::IntoIter<RemoteNode>,
}

pub struct TreeWalk<'a> {
    lister: &'a NodeLister,
    descend: DescendFn,
    /// Start identity, consumed on the first `next` call so construction
    /// stays synchronous.
    pending_start: Option<NodeIdentity>,
    stack: Vec<Frame>,
}

impl<'a> TreeWalk<'a> {
    pub(super) fn new(lister: &'a NodeLister, start: NodeIdentity, descend: DescendFn) -> Self {
        Self {
            lister,
            descend,
            pending_start: Some(start),
            stack: Vec::new(),
        }
    }

    /// The next node in depth-first pre-order, or `None` when the walk is
    /// exhausted. Yields a node before descending into it.
    pub async fn next(&mut self) -> Result<Option<(Vec<String>, RemoteNode)>> {
        if let Some(start) = self.pending_start.take() {
            let children = self.lister.list_children(&start).await?;
            self.stack.push(Frame {
                path: Vec::new(),
                children: children.into_iter(),
            });
        }

        loop {
            let (path, node) = {
                let frame = match self.stack.last_mut() {
                    Some(frame) => frame,
                    None => return Ok(None),
                };
                match frame.children.next() {
                    Some(node) => {
                        let mut path = frame.path.clone();
                        path.push(node.name().to_string());
                        (path, node)
                    }
                    None => {
                        self.stack.pop();
                        continue;
                    }
                }
            };

            if let RemoteNode::Folder(folder) = &node {
                if (self.descend)(&path, folder) {
                    if self.stack.len() >= MAX_DEPTH {
                        return Err(SyncError::DepthExceeded(MAX_DEPTH));
                    }
                    let children = self.lister.list_children(&folder.identity).await?;
                    self.stack.push(Frame {
                        path: path.clone(),
                        children: children.into_iter(),
                    });
                }
            }

            return Ok(Some((path, node)));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::remote::RemoteDrive;
    use crate::tree::stub::{file, folder, identity, StubRemote};
    use crate::tree::NodeLister;
    use std::sync::Arc;

    fn lister(stub: StubRemote) -> NodeLister {
        NodeLister::new(Arc::new(stub) as Arc<dyn RemoteDrive>)
    }

    #[tokio::test]
    async fn walks_depth_first_pre_order() {
        let stub = StubRemote::with_children(&[
            ("", vec![folder("a", "a"), file("x", "x.txt")]),
            ("a", vec![file("a/1", "one"), folder("a/b", "b")]),
            ("a/b", vec![file("a/b/2", "two")]),
        ]);
        let lister = lister(stub);

        let mut walk = lister.walk(&identity(""), Box::new(|_, _| true));
        let mut order = Vec::new();
        while let Some((path, _)) = walk.next().await.unwrap() {
            order.push(path.join("/"));
        }
        assert_eq!(order, vec!["a", "a/one", "a/b", "a/b/two", "x.txt"]);
    }

    #[tokio::test]
    async fn descend_predicate_prunes_subtrees() {
        let stub = StubRemote::with_children(&[
            ("", vec![folder("a", "a"), folder("b", "b")]),
            ("a", vec![file("a/1", "one")]),
            ("b", vec![file("b/2", "two")]),
        ]);
        let lister = lister(stub);

        let mut walk = lister.walk(
            &identity(""),
            Box::new(|path, _| path.first().map(String::as_str) == Some("a")),
        );
        let mut order = Vec::new();
        while let Some((path, _)) = walk.next().await.unwrap() {
            order.push(path.join("/"));
        }
        // "b" itself is yielded but never entered.
        assert_eq!(order, vec!["a", "a/one", "b"]);
    }

    #[tokio::test]
    async fn walk_suspends_between_yields() {
        let stub = Arc::new(StubRemote::with_children(&[
            ("", vec![folder("a", "a")]),
            ("a", vec![file("a/1", "one")]),
        ]));
        let lister = NodeLister::new(Arc::clone(&stub) as Arc<dyn RemoteDrive>);

        let mut walk = lister.walk(&identity(""), Box::new(|_, _| true));
        let (path, _) = walk.next().await.unwrap().unwrap();
        assert_eq!(path, vec!["a"]);
        // Nothing forces the rest of the traversal; dropping the walk here
        // must be fine.
        drop(walk);
    }

    #[tokio::test]
    async fn depth_guard_stops_cyclic_remotes() {
        // A "tree" whose folder lists itself as its own child.
        let stub = StubRemote::with_children(&[("", vec![folder("", "loop")])]);
        let lister = lister(stub);

        let mut walk = lister.walk(&identity(""), Box::new(|_, _| true));
        let result = loop {
            match walk.next().await {
                Ok(Some(_)) => continue,
                other => break other,
            }
        };
        assert!(matches!(
            result,
            Err(crate::error::SyncError::DepthExceeded(_))
        ));
    }
}
