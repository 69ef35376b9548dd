//! Inspect command implementation.

use super::{open_store, session_key};
use scorm_sync_protocol::{BatchId, OutboxSnapshot, WireMessage};
use scorm_sync_storage::DurableStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub dir: String,
    /// One entry per snapshot.
    pub snapshots: Vec<SnapshotStats>,
    /// Batches pending across all snapshots.
    pub total_batches: usize,
    /// Elements pending across all snapshots.
    pub total_elements: usize,
}

/// Statistics for a single snapshot.
#[derive(Debug, Serialize)]
pub struct SnapshotStats {
    /// Durable key.
    pub key: String,
    /// Stored size in bytes.
    pub size: usize,
    /// Number of pending batches.
    pub batches: usize,
    /// Number of pending elements.
    pub elements: usize,
    /// Lowest pending batch id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_batch: Option<BatchId>,
    /// Highest pending batch id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_batch: Option<BatchId>,
    /// Data model keys written by pending elements (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    /// Decode failure, if the snapshot is unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotStats {
    fn from_bytes(key: String, bytes: &[u8], list_keys: bool) -> Self {
        let mut stats = SnapshotStats {
            key,
            size: bytes.len(),
            batches: 0,
            elements: 0,
            first_batch: None,
            last_batch: None,
            keys: None,
            error: None,
        };
        match OutboxSnapshot::decode(bytes) {
            Ok(snapshot) => {
                stats.batches = snapshot.sent.len();
                stats.elements = snapshot.element_count();
                stats.first_batch = snapshot.sent.keys().next().copied();
                stats.last_batch = snapshot.sent.keys().next_back().copied();
                if list_keys {
                    let keys: BTreeSet<&str> = snapshot
                        .sent
                        .values()
                        .flatten()
                        .map(|e| e.key.as_str())
                        .collect();
                    stats.keys = Some(keys.into_iter().map(str::to_string).collect());
                }
            }
            Err(e) => stats.error = Some(e.to_string()),
        }
        stats
    }
}

/// Collects statistics for every snapshot, or for one session's.
pub fn inspect(
    dir: &Path,
    session: Option<&str>,
    list_keys: bool,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let store = open_store(dir)?;
    let keys = match session {
        Some(session) => vec![session_key(session)],
        None => store.keys()?,
    };

    let mut snapshots = Vec::new();
    for key in keys {
        if let Some(bytes) = store.get(&key)? {
            snapshots.push(SnapshotStats::from_bytes(key, &bytes, list_keys));
        }
    }
    if let Some(session) = session {
        if snapshots.is_empty() {
            return Err(format!("No snapshot for session {session}").into());
        }
    }

    Ok(InspectResult {
        dir: dir.display().to_string(),
        total_batches: snapshots.iter().map(|s| s.batches).sum(),
        total_elements: snapshots.iter().map(|s| s.elements).sum(),
        snapshots,
    })
}

/// Runs the inspect command.
pub fn run(
    dir: &Path,
    session: Option<&str>,
    list_keys: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(dir, session, list_keys)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("SCORM Sync Store Inspection");
    println!("===========================");
    println!();
    println!("Directory: {}", result.dir);
    println!("Snapshots: {}", result.snapshots.len());
    println!("Pending:   {} batches, {} elements", result.total_batches, result.total_elements);

    for snapshot in &result.snapshots {
        println!();
        println!("{} ({} bytes)", snapshot.key, snapshot.size);
        if let Some(error) = &snapshot.error {
            println!("  unreadable: {error}");
            continue;
        }
        println!("  Batches:  {}", snapshot.batches);
        println!("  Elements: {}", snapshot.elements);
        if let (Some(first), Some(last)) = (snapshot.first_batch, snapshot.last_batch) {
            println!("  Ids:      {first} .. {last}");
        }
        if let Some(keys) = &snapshot.keys {
            println!("  Keys:");
            for key in keys {
                println!("    {key}");
            }
        }
    }
}
