//! Flat-file artifact store. Each stage persists its complete output here
//! before the next stage reads it back — the artifacts are the only channel
//! between stages.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use talklab_common::HarvestError;

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HarvestError> {
    let file = fs::File::create(path)
        .map_err(|e| HarvestError::Artifact(format!("create {}: {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| HarvestError::Artifact(format!("write {}: {e}", path.display())))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HarvestError> {
    let file = fs::File::open(path)
        .map_err(|e| HarvestError::Artifact(format!("open {}: {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| HarvestError::Artifact(format!("read {}: {e}", path.display())))
}

/// Remove every file in `dir`. Called between asset batches so only one
/// batch's worth of audio ever exists on disk. A missing dir is fine.
pub fn clear_dir(dir: &Path) -> Result<(), HarvestError> {
    if !dir.exists() {
        return Ok(());
    }
    let entries = fs::read_dir(dir)
        .map_err(|e| HarvestError::Artifact(format!("read dir {}: {e}", dir.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| HarvestError::Artifact(format!("read dir {}: {e}", dir.display())))?;
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| {
                HarvestError::Artifact(format!("remove {}: {e}", path.display()))
            })?;
        } else {
            warn!(path = %path.display(), "Unexpected non-file in working dir, leaving it");
        }
    }
    Ok(())
}
