#![forbid(unsafe_code)]

//! Startup bootstrap: makes sure the working directories exist and loads the
//! download archive into memory.

use crate::archive::DownloadArchive;
use crate::config::{
    DEFAULT_ARCHIVE_NAME, DEFAULT_CHANNELS_FILE, DEFAULT_COOKIES_FILE, DEFAULT_DOWNLOAD_ROOT,
    DEFAULT_METADATA_ROOT, RuntimePaths,
};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Every filesystem location a download pass touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub download_root: PathBuf,
    pub metadata_root: PathBuf,
    pub archive: PathBuf,
    pub channels: PathBuf,
    pub cookies: PathBuf,
}

impl Default for WorkspacePaths {
    fn default() -> Self {
        Self::with_roots(
            Path::new(DEFAULT_DOWNLOAD_ROOT),
            Path::new(DEFAULT_METADATA_ROOT),
        )
    }
}

impl From<RuntimePaths> for WorkspacePaths {
    fn from(runtime: RuntimePaths) -> Self {
        Self {
            download_root: runtime.download_root,
            metadata_root: runtime.metadata_root,
            archive: runtime.archive_file,
            channels: runtime.channels_file,
            cookies: runtime.cookies_file,
        }
    }
}

impl WorkspacePaths {
    /// Builds the layout around the given roots, keeping the archive inside
    /// the download root and the channel list and cookie jar in the working
    /// directory.
    pub fn with_roots(download_root: &Path, metadata_root: &Path) -> Self {
        Self {
            download_root: download_root.to_path_buf(),
            metadata_root: metadata_root.to_path_buf(),
            archive: download_root.join(DEFAULT_ARCHIVE_NAME),
            channels: PathBuf::from(DEFAULT_CHANNELS_FILE),
            cookies: PathBuf::from(DEFAULT_COOKIES_FILE),
        }
    }

    /// Creates the download and metadata roots. Safe to call repeatedly.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.download_root, &self.metadata_root] {
            if dir.exists() && !dir.is_dir() {
                bail!("{} exists but is not a directory", dir.display());
            }
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Prepares the workspace and returns the archive of already downloaded ids.
///
/// Call once at startup; the returned archive is the only state the rest of
/// the pass needs.
pub fn initialize(paths: &WorkspacePaths) -> Result<DownloadArchive> {
    paths.prepare()?;
    let archive = DownloadArchive::load(&paths.archive)?;
    info!(
        archive = %paths.archive.display(),
        count = archive.len(),
        "workspace ready"
    );
    Ok(archive)
}
