//! Clear command implementation.

use super::{open_store, session_key};
use scorm_sync_storage::DurableStore;
use std::path::Path;
use tracing::info;

/// Removes the snapshot of `session`.
///
/// Returns false if there was nothing to remove.
pub fn clear(dir: &Path, session: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let store = open_store(dir)?;
    let key = session_key(session);
    if store.get(&key)?.is_none() {
        return Ok(false);
    }
    store.remove(&key)?;
    info!(key = %key, "snapshot removed");
    Ok(true)
}

/// Runs the clear command.
pub fn run(dir: &Path, session: &str) -> Result<(), Box<dyn std::error::Error>> {
    if clear(dir, session)? {
        println!("Removed snapshot for session {session}");
    } else {
        println!("No snapshot for session {session}");
    }
    Ok(())
}
