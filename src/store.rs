//! Durable key-value persistence shared by the hash caches.
//!
//! The caches only need a transactional get/put over named tables, so the
//! whole capability is a thin handle around a sled database. Each cache owns
//! one named tree; read-and-touch and upsert run inside per-key sled
//! transactions so concurrent invocations of the tool never lose updates.

use crate::error::Result;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tree holding local path -> (mtime, hash, atime) rows.
pub const LOCAL_HASH_TREE: &str = "local_hash_cache";

/// Tree holding (node, volume, share, revision) -> (hash, atime) rows.
pub const REMOTE_HASH_TREE: &str = "remote_hash_cache";

/// Handle to the on-disk store. Cheap to clone; all clones share the
/// underlying database.
#[derive(Clone)]
pub struct Persistence {
    db: sled::Db,
}

impl Persistence {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open a throwaway in-memory-backed database. Test helper.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn tree(&self, name: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(name)?)
    }
}

/// Current wall-clock time as unix seconds. Clamped to zero for clocks set
/// before the epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A file's modification time as unix seconds, integer precision.
/// Sub-second changes are deliberately invisible at this granularity.
pub fn mtime_secs(metadata: &std::fs::Metadata) -> Result<i64> {
    let modified = metadata.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}
