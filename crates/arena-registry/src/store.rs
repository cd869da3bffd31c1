//! JSON disk snapshot of the profile list.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write never leaves a truncated snapshot.  The file is written
//! only by the background flusher; the simulation task reads it exactly
//! once, at startup.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use thiserror::Error;

use crate::profile::AgentProfile;

#[derive(Debug, Error)]
pub enum RegistryStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load the profile list, or an empty list when no snapshot exists yet.
pub fn load_profiles(path: &Path) -> Result<Vec<AgentProfile>, RegistryStoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Atomically replace the snapshot at `path`.
pub fn save_profiles(path: &Path, profiles: &[AgentProfile]) -> Result<(), RegistryStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        let body = serde_json::to_vec_pretty(profiles)?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
