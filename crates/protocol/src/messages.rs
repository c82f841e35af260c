//! Wire types for WebExplorer.
//!
//! This module defines the records exchanged between the daemon and its
//! clients. Everything is serialized as JSON with the field names browsers
//! already expect (`isDirectory`, `type`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Semantic classification tag for a filesystem object.
///
/// The set is closed. Anything the classifier does not recognise is
/// [`FileType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Txt,
    Jpeg,
    Jpg,
    Zip,
    Tar,
    Mp3,
    Json,
    Png,
    Mkv,
    Mp4,
    Img,
    Pdf,
    Doc,
    Docx,
    Gz,
    Part,
    Deb,
    Exe,
    Xlsx,
    Xls,
    Csv,
    Xz,
    Tgz,
    #[serde(rename = "AppImage")]
    AppImage,
    Conf,
    Mov,
    Gif,
    Bmp,
    Webm,
    Webp,
    Log,
    Md,
    /// A directory entry.
    Directory,
    /// A mounted volume root.
    Drive,
    /// Anything unclassified, including names without an extension.
    #[default]
    Unknown,
}

impl FileType {
    /// Every tag, in declaration order.
    pub const ALL: [FileType; 35] = [
        FileType::Txt,
        FileType::Jpeg,
        FileType::Jpg,
        FileType::Zip,
        FileType::Tar,
        FileType::Mp3,
        FileType::Json,
        FileType::Png,
        FileType::Mkv,
        FileType::Mp4,
        FileType::Img,
        FileType::Pdf,
        FileType::Doc,
        FileType::Docx,
        FileType::Gz,
        FileType::Part,
        FileType::Deb,
        FileType::Exe,
        FileType::Xlsx,
        FileType::Xls,
        FileType::Csv,
        FileType::Xz,
        FileType::Tgz,
        FileType::AppImage,
        FileType::Conf,
        FileType::Mov,
        FileType::Gif,
        FileType::Bmp,
        FileType::Webm,
        FileType::Webp,
        FileType::Log,
        FileType::Md,
        FileType::Directory,
        FileType::Drive,
        FileType::Unknown,
    ];

    /// The tag as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Txt => "txt",
            FileType::Jpeg => "jpeg",
            FileType::Jpg => "jpg",
            FileType::Zip => "zip",
            FileType::Tar => "tar",
            FileType::Mp3 => "mp3",
            FileType::Json => "json",
            FileType::Png => "png",
            FileType::Mkv => "mkv",
            FileType::Mp4 => "mp4",
            FileType::Img => "img",
            FileType::Pdf => "pdf",
            FileType::Doc => "doc",
            FileType::Docx => "docx",
            FileType::Gz => "gz",
            FileType::Part => "part",
            FileType::Deb => "deb",
            FileType::Exe => "exe",
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
            FileType::Csv => "csv",
            FileType::Xz => "xz",
            FileType::Tgz => "tgz",
            FileType::AppImage => "AppImage",
            FileType::Conf => "conf",
            FileType::Mov => "mov",
            FileType::Gif => "gif",
            FileType::Bmp => "bmp",
            FileType::Webm => "webm",
            FileType::Webp => "webp",
            FileType::Log => "log",
            FileType::Md => "md",
            FileType::Directory => "directory",
            FileType::Drive => "drive",
            FileType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ProtocolError;

    /// Parse a wire tag. Matching is exact; use the daemon's classifier to
    /// map arbitrary extensions.
    fn from_str(s: &str) -> Result<Self> {
        FileType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownFileType(s.to_string()))
    }
}

/// Metadata record for one filesystem object or volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Final path component (the root path itself for volume roots).
    pub name: String,
    /// Absolute filesystem path.
    pub path: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Classification tag.
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Lowercase extension, empty when there is none.
    #[serde(default)]
    pub extension: String,
    /// Whether the entry can be browsed into.
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
}

impl FileEntry {
    /// Entry for a regular file (or anything that is not a directory).
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        extension: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            file_type,
            extension: extension.into(),
            is_directory: false,
        }
    }

    /// Entry for a directory. Size is always zero.
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            file_type: FileType::Directory,
            extension: String::new(),
            is_directory: true,
        }
    }

    /// Entry for a volume root. `size` is the capacity when known.
    pub fn drive(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            file_type: FileType::Drive,
            extension: String::new(),
            is_directory: true,
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Request path that failed (e.g. `/download`).
    pub path: String,
    /// Human-readable message.
    pub error: String,
    /// HTTP status code.
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(path: impl Into<String>, error: impl Into<String>, status: u16) -> Self {
        Self {
            path: path.into(),
            error: error.into(),
            status,
        }
    }
}

/// Encode a listing as pretty-printed JSON.
pub fn entries_to_json_pretty(entries: &[FileEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).map_err(ProtocolError::from)
}

/// Decode a listing from JSON bytes.
pub fn entries_from_json(bytes: &[u8]) -> Result<Vec<FileEntry>> {
    serde_json::from_slice(bytes).map_err(ProtocolError::from)
}
