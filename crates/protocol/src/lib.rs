//! # WebExplorer Protocol Library
//!
//! Wire types shared by the WebExplorer daemon and its clients.
//!
//! ## Overview
//!
//! - **File entries**: [`FileEntry`] describes one file, directory or volume
//! - **Type tags**: [`FileType`] is the closed classification set
//! - **Error bodies**: [`ErrorResponse`] is what every failed request returns
//!
//! All types serialize to JSON.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{FileEntry, FileType};
//!
//! let entry = FileEntry::file("clip.webm", "/videos/clip.webm", 4096, "webm", FileType::Webm);
//! let json = serde_json::to_string(&entry).unwrap();
//! assert!(json.contains("\"isDirectory\":false"));
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Record definitions and JSON helpers
//! - [`error`]: Error types

pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    entries_from_json, entries_to_json_pretty, ErrorResponse, FileEntry, FileType,
};
