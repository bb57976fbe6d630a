#![forbid(unsafe_code)]

//! Cookie jar handling for yt-dlp. Only existence is checked; the jar is
//! passed through untouched.

use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Copies a Netscape cookie jar into place. The copy is staged in a uniquely
/// named temp file next to `dest` and renamed over it, so a crash never leaves
/// a half-written jar behind and the source is never opened for writing.
pub fn install_cookies(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_file() {
        bail!("cookie file {} does not exist", source.display());
    }

    let parent = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;

    let mut input = File::open(source).with_context(|| format!("opening {}", source.display()))?;
    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("staging cookie jar in {}", parent.display()))?;
    io::copy(&mut input, staged.as_file_mut())
        .with_context(|| format!("copying {}", source.display()))?;
    staged
        .persist(dest)
        .map_err(|err| err.error)
        .with_context(|| format!("finalizing {}", dest.display()))?;
    info!(path = %dest.display(), "installed cookie jar");
    Ok(())
}

/// Extra yt-dlp arguments for the jar at `path`, empty when it is absent.
pub fn cookie_args(path: &Path) -> Vec<OsString> {
    if path.is_file() {
        vec![OsString::from("--cookies"), path.as_os_str().to_owned()]
    } else {
        Vec::new()
    }
}
