//! Content-hash cache for remote file revisions.
//!
//! Keyed by the full (node, volume, share, revision) composite. A revision's
//! content is immutable, so a present row is always valid; there is no
//! staleness check and no recomputation path here. Learning a remote hash
//! always happens through a download performed by the transfer layer.

use crate::error::{Result, SyncError};
use crate::store::{unix_now, Persistence, REMOTE_HASH_TREE};
use crate::types::{NodeIdentity, RevisionId};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;

#[derive(Debug, Serialize, Deserialize)]
struct RemoteEntry {
    hash: String,
    atime: i64,
}

pub struct RemoteHashCache {
    tree: sled::Tree,
}

impl RemoteHashCache {
    pub fn new(persistence: &Persistence) -> Result<Self> {
        Ok(Self {
            tree: persistence.tree(REMOTE_HASH_TREE)?,
        })
    }

    fn key_for(identity: &NodeIdentity, revision: &RevisionId) -> Result<Vec<u8>> {
        let share = identity.share_id()?;
        // bincode length-prefixes each component, so the composite key is
        // unambiguous even when ids contain separator-looking bytes.
        Ok(bincode::serialize(&(
            identity.node_id.as_str(),
            identity.volume_id.as_str(),
            share.as_str(),
            revision.as_str(),
        ))?)
    }

    /// Insert or replace the hash for one revision.
    pub fn put(&self, identity: &NodeIdentity, revision: &RevisionId, hash: &str) -> Result<()> {
        let key = Self::key_for(identity, revision)?;
        let entry = RemoteEntry {
            hash: hash.to_string(),
            atime: unix_now(),
        };
        self.tree.insert(key, bincode::serialize(&entry)?)?;
        Ok(())
    }

    /// Look up the hash for one revision, touching its access time
    /// atomically with the read.
    pub fn get(&self, identity: &NodeIdentity, revision: &RevisionId) -> Result<Option<String>> {
        let key = Self::key_for(identity, revision)?;
        let found = self.tree.transaction(|tx| {
            let raw = match tx.get(&key)? {
                Some(raw) => raw,
                None => return Ok(None),
            };
            let mut entry: RemoteEntry = bincode::deserialize(&raw)
                .map_err(|e| ConflictableTransactionError::Abort(SyncError::from(e)))?;
            entry.atime = unix_now();
            let updated = bincode::serialize(&entry)
                .map_err(|e| ConflictableTransactionError::Abort(SyncError::from(e)))?;
            tx.insert(key.as_slice(), updated)?;
            Ok(Some(entry.hash))
        })?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, ShareId, VolumeId};

    fn identity(node: &str) -> NodeIdentity {
        NodeIdentity::new(ShareId::new("share"), VolumeId::new("vol"), NodeId::new(node))
    }

    #[test]
    fn absent_key_reads_as_none() {
        let cache = RemoteHashCache::new(&Persistence::temporary().unwrap()).unwrap();
        let rev = RevisionId::new("r1");
        assert!(cache.get(&identity("n1"), &rev).unwrap().is_none());
    }

    #[test]
    fn latest_write_wins_and_stays() {
        let cache = RemoteHashCache::new(&Persistence::temporary().unwrap()).unwrap();
        let id = identity("n1");
        let rev = RevisionId::new("r1");

        cache.put(&id, &rev, "blake3-first").unwrap();
        cache.put(&id, &rev, "blake3-second").unwrap();
        assert_eq!(cache.get(&id, &rev).unwrap().unwrap(), "blake3-second");
        // A further read still sees the latest write.
        assert_eq!(cache.get(&id, &rev).unwrap().unwrap(), "blake3-second");
    }

    #[test]
    fn keys_are_scoped_per_revision_and_node() {
        let cache = RemoteHashCache::new(&Persistence::temporary().unwrap()).unwrap();
        let id = identity("n1");

        cache.put(&id, &RevisionId::new("r1"), "blake3-one").unwrap();
        cache.put(&id, &RevisionId::new("r2"), "blake3-two").unwrap();
        cache
            .put(&identity("n2"), &RevisionId::new("r1"), "blake3-other")
            .unwrap();

        assert_eq!(
            cache.get(&id, &RevisionId::new("r1")).unwrap().unwrap(),
            "blake3-one"
        );
        assert_eq!(
            cache.get(&id, &RevisionId::new("r2")).unwrap().unwrap(),
            "blake3-two"
        );
    }

    #[test]
    fn identity_without_share_is_rejected() {
        let cache = RemoteHashCache::new(&Persistence::temporary().unwrap()).unwrap();
        let mut id = identity("n1");
        id.share_id = None;
        match cache.get(&id, &RevisionId::new("r1")) {
            Err(SyncError::InvariantViolation(_)) => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }
}
