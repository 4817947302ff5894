//! Persistent content-hash caches.
//!
//! Two sled-backed tables: one keyed by local path and modification time,
//! one keyed by remote revision identity. Rows are only ever read or
//! upserted; nothing evicts them. Every read also touches the row's
//! last-access time inside the same transaction.

pub mod local;
pub mod remote;

pub use local::LocalHashCache;
pub use remote::RemoteHashCache;
