//! CLI command implementations.

pub mod clear;
pub mod inspect;
pub mod verify;

use scorm_sync_engine::EngineConfig;
use scorm_sync_storage::FileStore;
use std::path::Path;

/// Returns the durable key of a session.
pub fn session_key(session: &str) -> String {
    EngineConfig::new(session, "").storage_key()
}

/// Opens an existing store directory without creating it.
pub fn open_store(dir: &Path) -> Result<FileStore, Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("No store found at {}", dir.display()).into());
    }
    Ok(FileStore::open(dir)?)
}
