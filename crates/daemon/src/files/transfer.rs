//! File content delivery, whole or by byte range.
//!
//! Files are opened with `tokio::fs`, so open, seek and every chunked read
//! run on the runtime's blocking pool. The returned stream owns the file
//! handle: dropping it (end of body, client disconnect, error) closes the
//! file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::classify::extension_of;
use super::range::{resolve, ByteRange};

/// Default read chunk size (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Maximum read chunk size (1MB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Content type used when probing gives no answer.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Errors that can occur while opening or reading a file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The path exists but is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Whether the caller should report this as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::NotAFile(_))
    }
}

/// An opened, positioned and bounded file body.
#[derive(Debug)]
pub struct FileStream {
    /// Final path component, for `Content-Disposition`.
    pub file_name: String,
    /// Resolved MIME type.
    pub content_type: String,
    /// Byte interval being delivered.
    pub range: ByteRange,
    stream: ReaderStream<Take<File>>,
}

impl FileStream {
    /// Number of bytes the stream will yield.
    pub fn len(&self) -> u64 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Consume into the chunk stream. Dropping it closes the file.
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        self.stream
    }
}

/// MIME type of `path` from its extension, or `application/octet-stream`.
pub fn probe_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Content type for the streaming endpoint.
///
/// Common video containers are pinned to browser-playable types (`.ogg` is
/// otherwise probed as audio) before falling back to probing.
pub fn streaming_content_type(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match extension_of(&name).as_str() {
        "mp4" => "video/mp4".to_string(),
        "webm" => "video/webm".to_string(),
        "ogg" => "video/ogg".to_string(),
        _ => probe_content_type(path),
    }
}

/// File transfer handler.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    chunk_size: usize,
}

impl Default for FileTransfer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl FileTransfer {
    /// Create a handler reading in chunks of `chunk_size` bytes
    /// (clamped to `1..=MAX_CHUNK_SIZE`).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Length of a regular file, or why it cannot be served.
    async fn file_length(path: &Path) -> Result<u64, TransferError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::FileNotFound(path.to_path_buf())
            } else {
                TransferError::Io(e)
            }
        })?;

        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path.to_path_buf()));
        }

        Ok(metadata.len())
    }

    /// Open `path` and expose bytes `start..=end` only.
    ///
    /// `end` is clamped to the last byte; `start > end` restarts at 0.
    pub async fn open(&self, path: &Path, start: u64, end: u64) -> Result<FileStream, TransferError> {
        let total = Self::file_length(path).await?;
        let last = total.saturating_sub(1);
        let end = end.min(last);
        let start = if start > end { 0 } else { start };

        let range = ByteRange {
            start,
            end,
            total,
            partial: false,
        };
        self.open_resolved(path, range, probe_content_type(path)).await
    }

    /// Open the whole file for download.
    pub async fn open_download(&self, path: &Path) -> Result<FileStream, TransferError> {
        let total = Self::file_length(path).await?;
        let range = resolve(None, total);
        self.open_resolved(path, range, probe_content_type(path)).await
    }

    /// Open the part of the file selected by an optional `Range` header.
    pub async fn open_range(
        &self,
        path: &Path,
        range_header: Option<&str>,
    ) -> Result<FileStream, TransferError> {
        let total = Self::file_length(path).await?;
        let range = resolve(range_header, total);
        self.open_resolved(path, range, streaming_content_type(path)).await
    }

    async fn open_resolved(
        &self,
        path: &Path,
        range: ByteRange,
        content_type: String,
    ) -> Result<FileStream, TransferError> {
        let mut file = File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::FileNotFound(path.to_path_buf())
            } else {
                TransferError::Io(e)
            }
        })?;

        if range.start > 0 {
            file.seek(SeekFrom::Start(range.start)).await?;
        }

        debug!(
            path = %path.display(),
            start = range.start,
            end = range.end,
            total = range.total,
            "Opened file stream"
        );

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(FileStream {
            file_name,
            content_type,
            range,
            stream: ReaderStream::with_capacity(file.take(range.len()), self.chunk_size),
        })
    }
}
