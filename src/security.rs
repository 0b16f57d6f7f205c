#![forbid(unsafe_code)]

//! Shared security helpers used by the TutorTube binaries.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Fails fast when a binary is started as root. The backend only needs to
/// bind a port and read the frontend bundle, so a regular unprivileged user
/// is always enough.
pub fn ensure_not_root(process: &str) -> Result<()> {
    ensure_not_root_for(Uid::current(), process)
}

fn ensure_not_root_for(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!(
            "{process} must not be run as root; use a regular user or a dedicated service account"
        );
    }
    Ok(())
}
