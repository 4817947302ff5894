//! Skiff: content-addressed file sync
//!
//! Syncs files between the local filesystem and a hierarchical remote drive,
//! using blake3 content hashes on both sides to skip redundant transfers and
//! surface conflicts instead of silently clobbering data.

pub mod cache;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod remote;
pub mod store;
pub mod transfer;
pub mod tree;
pub mod types;
