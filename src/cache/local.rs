//! Content-hash cache for local files.
//!
//! One row per canonical absolute path: (modification time, hash, access
//! time). A cached hash is valid iff the stored modification time equals the
//! file's current modification time to the second; any mismatch forces a
//! recomputation and overwrites the row.

use crate::error::{Result, SyncError};
use crate::hasher;
use crate::store::{mtime_secs, unix_now, Persistence, LOCAL_HASH_TREE};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct LocalEntry {
    mtime: i64,
    hash: String,
    atime: i64,
}

/// Canonical absolute form of a local path, without requiring the path to
/// exist (download destinations are keyed before they are created).
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    Ok(dunce::simplified(&absolute).to_path_buf())
}

pub struct LocalHashCache {
    tree: sled::Tree,
}

impl LocalHashCache {
    pub fn new(persistence: &Persistence) -> Result<Self> {
        Ok(Self {
            tree: persistence.tree(LOCAL_HASH_TREE)?,
        })
    }

    fn key_for(path: &Path) -> Result<Vec<u8>> {
        let canonical = canonical_path(path)?;
        Ok(canonical.to_string_lossy().into_owned().into_bytes())
    }

    /// Insert or replace the row for `path`.
    pub fn put(&self, path: &Path, mtime: i64, hash: &str) -> Result<()> {
        let key = Self::key_for(path)?;
        let entry = LocalEntry {
            mtime,
            hash: hash.to_string(),
            atime: unix_now(),
        };
        self.tree.insert(key, bincode::serialize(&entry)?)?;
        Ok(())
    }

    /// Look up the row for `path`, touching its access time atomically with
    /// the read.
    pub fn get(&self, path: &Path) -> Result<Option<(i64, String)>> {
        let key = Self::key_for(path)?;
        let found = self.tree.transaction(|tx| {
            let raw = match tx.get(&key)? {
                Some(raw) => raw,
                None => return Ok(None),
            };
            let mut entry: LocalEntry = bincode::deserialize(&raw)
                .map_err(|e| ConflictableTransactionError::Abort(SyncError::from(e)))?;
            entry.atime = unix_now();
            let updated = bincode::serialize(&entry)
                .map_err(|e| ConflictableTransactionError::Abort(SyncError::from(e)))?;
            tx.insert(key.as_slice(), updated)?;
            Ok(Some((entry.mtime, entry.hash)))
        })?;
        Ok(found)
    }

    /// Cached hash for `path` if the row exists and is still fresh against
    /// the live file's modification time. Never reads file content.
    ///
    /// Returns `None` when the file is missing, the row is absent, or the
    /// row is stale.
    pub fn probe(&self, path: &Path) -> Result<Option<String>> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => return Ok(None),
        };
        let mtime = mtime_secs(&metadata)?;
        match self.get(path)? {
            Some((cached_mtime, hash)) if cached_mtime == mtime => Ok(Some(hash)),
            _ => Ok(None),
        }
    }

    /// Hash of the file at `path`, computed only when the cached row is
    /// absent or stale. Fails with [`SyncError::NotFound`] when the file
    /// cannot be opened; the cache row (if any) is left untouched.
    pub fn get_or_compute(&self, path: &Path) -> Result<String> {
        let path = canonical_path(path)?;
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(path.clone())
            } else {
                SyncError::Io(e)
            }
        })?;

        let metadata = file.metadata()?;
        let mtime = mtime_secs(&metadata)?;
        if let Some((cached_mtime, cached_hash)) = self.get(&path)? {
            if cached_mtime == mtime {
                return Ok(cached_hash);
            }
            debug!(path = %path.display(), "local hash cache row is stale, rehashing");
        }

        let mut reader = BufReader::new(file);
        let hash = hasher::hash_reader(&mut reader)?;
        self.put(&path, mtime, &hash)?;
        Ok(hash)
    }
}
