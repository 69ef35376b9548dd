//! Verify command implementation.

use super::open_store;
use scorm_sync_protocol::{OutboxSnapshot, WireMessage};
use scorm_sync_storage::DurableStore;
use std::path::Path;

/// Verification result.
#[derive(Debug)]
pub struct VerifyResult {
    /// Number of snapshots checked.
    pub snapshots_checked: usize,
    /// Number of batches checked.
    pub batches_checked: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn new() -> Self {
        Self {
            snapshots_checked: 0,
            batches_checked: 0,
            errors: Vec::new(),
        }
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every snapshot in the store.
pub fn verify(dir: &Path) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let store = open_store(dir)?;
    let mut result = VerifyResult::new();

    for key in store.keys()? {
        let Some(bytes) = store.get(&key)? else {
            continue;
        };
        result.snapshots_checked += 1;
        match OutboxSnapshot::decode(&bytes) {
            Ok(snapshot) => check_snapshot(&key, &snapshot, &mut result),
            Err(e) => result.errors.push(format!("{key}: cannot decode: {e}")),
        }
    }

    Ok(result)
}

fn check_snapshot(key: &str, snapshot: &OutboxSnapshot, result: &mut VerifyResult) {
    for (id, elements) in &snapshot.sent {
        result.batches_checked += 1;
        if elements.is_empty() {
            result.errors.push(format!("{key}: batch {id} is empty"));
        }
        for element in elements {
            if element.key.is_empty() {
                result
                    .errors
                    .push(format!("{key}: batch {id} has an element without a key"));
            }
            if !element.time.is_finite() {
                result.errors.push(format!(
                    "{key}: batch {id} element {} has timestamp {}",
                    element.key, element.time
                ));
            }
        }
    }
}

/// Runs the verify command.
pub fn run(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {}", dir.display());
    println!();

    let result = verify(dir)?;
    println!("Snapshots checked: {}", result.snapshots_checked);
    println!("Batches checked:   {}", result.batches_checked);
    for error in &result.errors {
        println!("  - {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorm_sync_storage::FileStore;
    use tempfile::tempdir;

    #[test]
    fn verify_clean_store() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store
            .put(
                "attempt-1-scorm-data",
                br#"{"sent":{"7":[{"key":"cmi.location","value":"p1","time":1.5,"sequence":0}]}}"#,
            )
            .unwrap();

        let result = verify(dir.path()).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.snapshots_checked, 1);
        assert_eq!(result.batches_checked, 1);
    }

    #[test]
    fn verify_reports_problems() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put("attempt-1-scorm-data", b"{").unwrap();
        store
            .put(
                "attempt-2-scorm-data",
                br#"{"sent":{"3":[],"4":[{"key":"","value":"x","time":1.0}]}}"#,
            )
            .unwrap();

        let result = verify(dir.path()).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].starts_with("attempt-1-scorm-data: cannot decode"));
        assert!(result.errors[1].contains("batch 3 is empty"));
        assert!(result.errors[2].contains("without a key"));
    }

    #[test]
    fn verify_empty_store() {
        let dir = tempdir().unwrap();
        let result = verify(dir.path()).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.snapshots_checked, 0);
    }
}
