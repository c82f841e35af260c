//! Volume discovery.
//!
//! Discovery is platform specific, so it sits behind the [`VolumeSource`]
//! trait and the implementation is picked once at startup by
//! [`platform_volume_source`]. Discovery never fails: anything unsupported
//! or unreadable simply contributes no entries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use protocol::FileEntry;
use tracing::{debug, warn};

use crate::config::FileConfig;

/// Strategy for enumerating mounted volumes.
pub trait VolumeSource: Send + Sync {
    /// One entry per mounted root or drive.
    fn list_all(&self) -> Vec<FileEntry>;

    /// Removable or external volumes only.
    fn list_removable(&self) -> Vec<FileEntry>;
}

/// Entry for a root: name and path are both the root path itself.
fn root_entry(root: &Path) -> FileEntry {
    let root = root.to_string_lossy().to_string();
    FileEntry::drive(root.clone(), root, 0)
}

/// Volume discovery for systems without a per-root removable flag.
///
/// Roots are fixed (`/` by default). Removable volumes are the immediate
/// children of conventional mount directories such as `/media`,
/// `/run/media` and `/Volumes`.
#[derive(Debug, Clone)]
pub struct MountDirVolumes {
    roots: Vec<PathBuf>,
    mount_dirs: Vec<PathBuf>,
}

impl MountDirVolumes {
    /// Discovery with `/` as the only root.
    pub fn new(mount_dirs: Vec<PathBuf>) -> Self {
        Self::with_roots(vec![PathBuf::from("/")], mount_dirs)
    }

    pub fn with_roots(roots: Vec<PathBuf>, mount_dirs: Vec<PathBuf>) -> Self {
        Self { roots, mount_dirs }
    }

    fn scan_mount_dir(dir: &Path) -> Vec<FileEntry> {
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "Mount directory not readable");
                return Vec::new();
            }
        };

        read_dir
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Skipping mount directory entry");
                    None
                }
            })
            .map(|entry| {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                let size = total_capacity(&path).unwrap_or(0);
                FileEntry::drive(name, path.to_string_lossy().to_string(), size)
            })
            .collect()
    }
}

impl VolumeSource for MountDirVolumes {
    fn list_all(&self) -> Vec<FileEntry> {
        self.roots
            .iter()
            .filter(|root| root.exists())
            .map(|root| root_entry(root))
            .collect()
    }

    fn list_removable(&self) -> Vec<FileEntry> {
        self.mount_dirs
            .iter()
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| Self::scan_mount_dir(dir))
            .collect()
    }
}

/// Total capacity in bytes of the filesystem holding `path`.
#[cfg(unix)]
pub fn total_capacity(path: &Path) -> Option<u64> {
    match nix::sys::statvfs::statvfs(path) {
        Ok(stat) => Some((stat.blocks() as u64).saturating_mul(stat.fragment_size() as u64)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "statvfs failed");
            None
        }
    }
}

#[cfg(not(unix))]
pub fn total_capacity(_path: &Path) -> Option<u64> {
    None
}

/// Drive-letter discovery with removable classification from the OS.
#[cfg(windows)]
#[derive(Debug, Clone, Default)]
pub struct DriveLetterVolumes;

#[cfg(windows)]
impl DriveLetterVolumes {
    /// `GetDriveTypeW` result for removable media.
    const DRIVE_REMOVABLE: u32 = 2;

    fn roots() -> Vec<PathBuf> {
        (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|root| root.exists())
            .collect()
    }

    fn is_removable(root: &Path) -> bool {
        use windows::core::PCWSTR;
        use windows::Win32::Storage::FileSystem::GetDriveTypeW;

        let wide: Vec<u16> = root
            .to_string_lossy()
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let drive_type = unsafe { GetDriveTypeW(PCWSTR(wide.as_ptr())) };
        drive_type == Self::DRIVE_REMOVABLE
    }
}

#[cfg(windows)]
impl VolumeSource for DriveLetterVolumes {
    fn list_all(&self) -> Vec<FileEntry> {
        Self::roots().iter().map(|root| root_entry(root)).collect()
    }

    fn list_removable(&self) -> Vec<FileEntry> {
        Self::roots()
            .iter()
            .filter(|root| Self::is_removable(root))
            .map(|root| root_entry(root))
            .collect()
    }
}

/// Pick the discovery strategy for the running platform.
#[cfg(windows)]
pub fn platform_volume_source(_config: &FileConfig) -> Arc<dyn VolumeSource> {
    Arc::new(DriveLetterVolumes)
}

/// Pick the discovery strategy for the running platform.
#[cfg(not(windows))]
pub fn platform_volume_source(config: &FileConfig) -> Arc<dyn VolumeSource> {
    Arc::new(MountDirVolumes::new(config.mount_dirs.clone()))
}

/// Run [`VolumeSource::list_all`] on the blocking thread pool.
pub async fn list_all_async(source: Arc<dyn VolumeSource>) -> Vec<FileEntry> {
    tokio::task::spawn_blocking(move || source.list_all())
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Volume discovery task failed");
            Vec::new()
        })
}

/// Run [`VolumeSource::list_removable`] on the blocking thread pool.
pub async fn list_removable_async(source: Arc<dyn VolumeSource>) -> Vec<FileEntry> {
    tokio::task::spawn_blocking(move || source.list_removable())
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Removable volume discovery task failed");
            Vec::new()
        })
}
