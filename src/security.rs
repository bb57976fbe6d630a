#![forbid(unsafe_code)]

//! Privilege checks shared by the archive binaries.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Refuses to continue when started as root, so the download tree, the
/// archive and the cookie jar are never created with root ownership.
pub fn ensure_not_root(process: &str) -> Result<()> {
    ensure_not_root_for(Uid::effective(), process)
}

fn ensure_not_root_for(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!(
            "{process} must not be run as root; the archive and downloads would end up owned by root"
        );
    }
    Ok(())
}
