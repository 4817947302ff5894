//! Transfer decision logic: skip, overwrite, conflict, or proceed.

pub mod download;
pub mod tentative;
pub mod upload;

pub use download::Downloader;
pub use tentative::TentativeFile;
pub use upload::Uploader;

/// How a single transfer ended. Conflicts and skips are ordinary outcomes,
/// reported and logged, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Bytes were moved and the caches were updated.
    Completed,
    /// Source and destination already share a hash; nothing was written.
    UpToDate,
    /// Hashes differ and overwriting was not allowed; the destination was
    /// left untouched.
    Conflict,
}

/// What an upload's logical target path denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Infer folder-vs-file from whatever already exists at the path.
    Unspecified,
    /// The final segment names the file to create or replace.
    File,
    /// The path names a folder; the upload keeps the source's base name.
    Folder,
}

/// Media type declared for uploads. Content is opaque to the sync engine.
pub const OCTET_STREAM: &str = "application/octet-stream";
