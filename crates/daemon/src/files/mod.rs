//! File access engine: listing, volume discovery and content delivery.
//!
//! This module provides the read-only filesystem operations behind the HTTP
//! routes:
//! - Type classification of file extensions
//! - Directory listing with per-entry metadata
//! - Mounted and removable volume discovery
//! - HTTP byte-range resolution and bounded file streams
//!
//! # Blocking I/O
//!
//! Every filesystem call is blocking. Async entry points dispatch them to
//! tokio's blocking pool (`spawn_blocking` or `tokio::fs`) so request
//! handling threads are never stalled by a slow disk.

pub mod browser;
pub mod classify;
pub mod range;
pub mod transfer;
pub mod volumes;

pub use browser::{inspect, BrowserError, DirEntries, DirectoryBrowser};
pub use classify::{classify, extension_of};
pub use range::{resolve, ByteRange};
pub use transfer::{FileStream, FileTransfer, TransferError};
pub use volumes::{platform_volume_source, MountDirVolumes, VolumeSource};
