//! Directory browsing.
//!
//! This module turns filesystem paths into [`FileEntry`] records. Listing is
//! fail-soft: a directory that is missing, is not a directory, or cannot be
//! read produces an empty listing rather than an error. Individual entries
//! that cannot be inspected are skipped without aborting the listing.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use protocol::FileEntry;
use thiserror::Error;
use tracing::{debug, warn};

use super::classify::{classify, extension_of};

/// Errors that can occur while inspecting directory entries.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Metadata for a single entry could not be read.
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The directory stream itself returned an error for one entry.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Build a [`FileEntry`] for a single filesystem object.
///
/// Symlinks are followed. Directories get `size = 0` and no extension;
/// everything else gets its byte length and a classified type.
pub fn inspect(path: &Path) -> Result<FileEntry, BrowserError> {
    let metadata = fs::metadata(path).map_err(|source| BrowserError::Inspect {
        path: path.to_path_buf(),
        source,
    })?;

    let name = display_name(path);
    let full_path = path.to_string_lossy().to_string();

    if metadata.is_dir() {
        return Ok(FileEntry::directory(name, full_path));
    }

    let extension = extension_of(&name);
    let file_type = classify(&extension);

    Ok(FileEntry::file(
        name,
        full_path,
        metadata.len(),
        extension,
        file_type,
    ))
}

/// Final path component, or the whole path for roots such as `/`.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Lazy iterator over the inspected children of one directory.
///
/// Created by [`DirectoryBrowser::entries`]. An unreadable directory yields
/// nothing.
pub struct DirEntries {
    inner: Option<ReadDir>,
}

impl Iterator for DirEntries {
    type Item = Result<FileEntry, BrowserError>;

    fn next(&mut self) -> Option<Self::Item> {
        let read_dir = self.inner.as_mut()?;
        match read_dir.next()? {
            Ok(entry) => Some(inspect(&entry.path())),
            Err(e) => Some(Err(BrowserError::Io(e))),
        }
    }
}

/// Directory browser rooted at a default path.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    /// Path listed when the caller does not supply one.
    default_root: PathBuf,
}

impl DirectoryBrowser {
    /// Create a browser that lists `default_root` when no path is given.
    pub fn new(default_root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: default_root.into(),
        }
    }

    /// Resolve a requested path to an absolute location.
    ///
    /// `None` and `""` map to the default root. Relative paths are resolved
    /// against the working directory; nothing is canonicalized.
    pub fn resolve_path(&self, path: Option<&str>) -> PathBuf {
        match path {
            None | Some("") => self.default_root.clone(),
            Some(p) => std::path::absolute(p).unwrap_or_else(|_| PathBuf::from(p)),
        }
    }

    /// Lazily enumerate the immediate children of `path`.
    ///
    /// Every call re-reads the directory.
    pub fn entries(&self, path: Option<&str>) -> DirEntries {
        let dir = self.resolve_path(path);

        let inner = match fs::read_dir(&dir) {
            Ok(read_dir) => Some(read_dir),
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "Directory not listable, returning empty listing");
                None
            }
        };

        DirEntries { inner }
    }

    /// List the immediate children of `path`, skipping entries that fail
    /// inspection. Order follows the filesystem.
    pub fn list(&self, path: Option<&str>) -> Vec<FileEntry> {
        self.entries(path)
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping directory entry");
                    None
                }
            })
            .collect()
    }

    /// [`list`](Self::list) on the blocking thread pool.
    pub async fn list_async(&self, path: Option<String>) -> Vec<FileEntry> {
        let browser = self.clone();
        match tokio::task::spawn_blocking(move || browser.list(path.as_deref())).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Directory listing task failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::FileType;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("subdir")).unwrap();
        fs::create_dir_all(dir.join(".hidden_dir")).unwrap();

        fs::write(dir.join("file.txt"), "Hello").unwrap();
        fs::write(dir.join("subdir/nested.txt"), "Nested").unwrap();
        fs::write(dir.join(".bashrc"), "export A=1").unwrap();
        fs::write(dir.join("Archive.tar.gz"), [0u8; 32]).unwrap();
    }

    fn names(entries: &[FileEntry]) -> HashSet<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_list_directory_matches_children() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new("/");
        let entries = browser.list(temp_dir.path().to_str());

        let expected: HashSet<String> = ["subdir", ".hidden_dir", "file.txt", ".bashrc", "Archive.tar.gz"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(entries.len(), expected.len());
        assert_eq!(names(&entries), expected);
    }

    #[test]
    fn test_list_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new("/");
        let entries = browser.list(temp_dir.path().to_str());
        assert!(!names(&entries).contains("nested.txt"));
    }

    #[test]
    fn test_file_entry_fields() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new("/");
        let entries = browser.list(temp_dir.path().to_str());

        let file = entries.iter().find(|e| e.name == "file.txt").unwrap();
        assert_eq!(file.size, 5);
        assert_eq!(file.extension, "txt");
        assert_eq!(file.file_type, FileType::Txt);
        assert!(!file.is_directory);
        assert_eq!(
            PathBuf::from(&file.path),
            temp_dir.path().join("file.txt")
        );

        let archive = entries.iter().find(|e| e.name == "Archive.tar.gz").unwrap();
        assert_eq!(archive.extension, "gz");
        assert_eq!(archive.file_type, FileType::Gz);
        assert_eq!(archive.size, 32);
    }

    #[test]
    fn test_hidden_file_has_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let entry = inspect(&temp_dir.path().join(".bashrc")).unwrap();
        assert_eq!(entry.extension, "");
        assert_eq!(entry.file_type, FileType::Unknown);
        assert_eq!(entry.size, 10);
    }

    #[test]
    fn test_directory_entry_invariants() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let entry = inspect(&temp_dir.path().join("subdir")).unwrap();
        assert!(entry.is_directory);
        assert_eq!(entry.file_type, FileType::Directory);
        assert_eq!(entry.size, 0);
        assert_eq!(entry.extension, "");
    }

    #[test]
    fn test_directory_with_dot_has_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("photos.2024")).unwrap();

        let entry = inspect(&temp_dir.path().join("photos.2024")).unwrap();
        assert_eq!(entry.extension, "");
        assert_eq!(entry.file_type, FileType::Directory);
    }

    #[test]
    fn test_uppercase_extension_is_lowercased() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("IMG_0001.JPG"), "jpg").unwrap();

        let entry = inspect(&temp_dir.path().join("IMG_0001.JPG")).unwrap();
        assert_eq!(entry.extension, "jpg");
        assert_eq!(entry.file_type, FileType::Jpg);
    }

    #[test]
    fn test_inspect_missing_path_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = inspect(&temp_dir.path().join("gone.txt"));
        assert!(matches!(result, Err(BrowserError::Inspect { .. })));
    }

    #[test]
    fn test_nonexistent_path_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nonexistent");

        let browser = DirectoryBrowser::new("/");
        assert!(browser.list(missing.to_str()).is_empty());
    }

    #[test]
    fn test_file_path_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), "Hello").unwrap();

        let browser = DirectoryBrowser::new("/");
        assert!(browser.list(temp_dir.path().join("file.txt").to_str()).is_empty());
    }

    #[test]
    fn test_empty_directory_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let browser = DirectoryBrowser::new("/");
        assert!(browser.list(temp_dir.path().to_str()).is_empty());
    }

    #[test]
    fn test_default_root_used_without_path() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new(temp_dir.path());
        assert_eq!(browser.list(None).len(), 5);
        assert_eq!(browser.list(Some("")).len(), 5);
        assert_eq!(browser.resolve_path(None), temp_dir.path());
    }

    #[test]
    fn test_relative_path_resolves_to_absolute() {
        let browser = DirectoryBrowser::new("/");
        let resolved = browser.resolve_path(Some("some/relative/dir"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/relative/dir"));
    }

    #[test]
    fn test_entries_is_restartable() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new("/");
        let first = browser.list(temp_dir.path().to_str());

        fs::write(temp_dir.path().join("late.log"), "x").unwrap();
        let second = browser.list(temp_dir.path().to_str());

        assert_eq!(second.len(), first.len() + 1);
        let late = second.iter().find(|e| e.name == "late.log").unwrap();
        assert_eq!(late.file_type, FileType::Log);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_skipped_not_fatal() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ok.md"), "# ok").unwrap();
        symlink(temp_dir.path().join("missing"), temp_dir.path().join("dangling")).unwrap();

        let browser = DirectoryBrowser::new("/");

        let results: Vec<_> = browser.entries(temp_dir.path().to_str()).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);

        let entries = browser.list(temp_dir.path().to_str());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "ok.md");
        assert_eq!(entries[0].file_type, FileType::Md);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_directory_is_directory() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("real")).unwrap();
        symlink(temp_dir.path().join("real"), temp_dir.path().join("alias")).unwrap();

        let entry = inspect(&temp_dir.path().join("alias")).unwrap();
        assert!(entry.is_directory);
        assert_eq!(entry.name, "alias");
    }

    #[tokio::test]
    async fn test_list_async() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let browser = DirectoryBrowser::new("/");
        let path = temp_dir.path().to_string_lossy().to_string();
        let entries = browser.list_async(Some(path)).await;
        assert_eq!(entries.len(), 5);

        let missing = temp_dir.path().join("nope").to_string_lossy().to_string();
        assert!(browser.list_async(Some(missing)).await.is_empty());
    }
}
