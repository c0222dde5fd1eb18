//! Durable per-account run progress.
//!
//! Each account's progress lives in its own JSON file under the store's
//! directory, overwritten atomically after every processed window. Writes
//! for one account never block another account's run: mutual exclusion is
//! scoped per key, not a single global lock.
//!
//! Reads are tolerant of a missing or corrupt backing file and treat it as
//! an empty store; corruption is never raised to the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AppError;
use crate::storage::write_json_atomic;

// ─────────────────────────────────────────────────────────────────────────────
// ProgressRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted progress for one account's most recent run activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Total order records in the run.
    pub total_orders: u64,
    /// Records not yet processed by a completed window.
    pub pending_orders: u64,
    /// Unix timestamp of the last window update.
    pub last_activity_time: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// ProgressStore
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed progress store, one JSON file per account.
#[derive(Clone)]
pub struct ProgressStore {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ProgressStore {
    /// Opens (creating if necessary) a progress store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create progress dir: {e}")))?;

        Ok(Self {
            dir,
            locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Durably overwrites the record for an account.
    pub async fn update(
        &self,
        account: &str,
        total_orders: u64,
        pending_orders: u64,
        timestamp: i64,
    ) -> Result<(), AppError> {
        let record = ProgressRecord {
            total_orders,
            pending_orders,
            last_activity_time: timestamp,
        };
        let path = self.path_for(account);

        let lock = self.lock_for(account).await;
        let _guard = lock.lock().await;

        tokio::task::spawn_blocking(move || write_json_atomic(&path, &record))
            .await
            .map_err(|e| AppError::Internal(format!("Progress write task failed: {e}")))?
    }

    /// Reads one account's record; missing or corrupt content yields `None`.
    pub async fn read(&self, account: &str) -> Option<ProgressRecord> {
        let bytes = tokio::fs::read(self.path_for(account)).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("[PROGRESS] Corrupt record for account {account}, treating as absent: {e}");
                None
            }
        }
    }

    /// Reads every account's record. Corrupt entries are skipped.
    pub async fn read_all(&self) -> HashMap<String, ProgressRecord> {
        let mut records = HashMap::new();

        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return records;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(account) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(bytes) = tokio::fs::read(&path).await else {
                continue;
            };
            match serde_json::from_slice(&bytes) {
                Ok(record) => {
                    records.insert(account.to_string(), record);
                }
                Err(e) => {
                    warn!("[PROGRESS] Skipping corrupt record for account {account}: {e}");
                }
            }
        }

        records
    }

    /// Removes an account's record. Idempotent.
    pub async fn remove(&self, account: &str) -> Result<(), AppError> {
        let lock = self.lock_for(account).await;
        let _guard = lock.lock().await;

        match tokio::fs::remove_file(self.path_for(account)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to remove progress record: {e}"
                )))
            }
        }

        self.locks.lock().await.remove(account);
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    fn path_for(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_account(account)))
    }

    async fn lock_for(&self, account: &str) -> Arc<Mutex<()>> {
        let mut guard = self.locks.lock().await;
        guard
            .entry(account.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Restricts account names to filesystem-safe characters.
fn sanitize_account(account: &str) -> String {
    account
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, ProgressStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = ProgressStore::open(dir.path().join("progress"))
            .await
            .expect("Failed to open store");
        (dir, store)
    }

    #[tokio::test]
    async fn update_then_read_all_round_trips() {
        let (_dir, store) = test_store().await;

        store.update("acct", 5, 2, 1_700_000_000).await.unwrap();

        let all = store.read_all().await;
        assert_eq!(
            all.get("acct"),
            Some(&ProgressRecord {
                total_orders: 5,
                pending_orders: 2,
                last_activity_time: 1_700_000_000,
            })
        );
    }

    #[tokio::test]
    async fn update_does_not_disturb_other_accounts() {
        let (_dir, store) = test_store().await;

        store.update("store-a", 10, 4, 100).await.unwrap();
        store.update("store-b", 3, 0, 200).await.unwrap();
        store.update("store-a", 10, 2, 300).await.unwrap();

        let all = store.read_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all["store-a"].pending_orders, 2);
        assert_eq!(all["store-b"].pending_orders, 0);
        assert_eq!(all["store-b"].last_activity_time, 200);
    }

    #[tokio::test]
    async fn read_absent_account_yields_none() {
        let (_dir, store) = test_store().await;

        assert!(store.read("nobody").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_absent() {
        let (_dir, store) = test_store().await;
        store.update("good", 1, 0, 1).await.unwrap();

        // Clobber another account's file with invalid JSON.
        tokio::fs::write(store.path_for("bad"), b"{not json")
            .await
            .unwrap();

        assert!(store.read("bad").await.is_none());
        let all = store.read_all().await;
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("good"));
    }

    #[tokio::test]
    async fn read_all_on_empty_store_is_empty() {
        let (_dir, store) = test_store().await;

        assert!(store.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, store) = test_store().await;
        store.update("acct", 5, 5, 1).await.unwrap();

        store.remove("acct").await.unwrap();
        store.remove("acct").await.unwrap();

        assert!(store.read("acct").await.is_none());
    }

    #[tokio::test]
    async fn overwrite_keeps_latest_record() {
        let (_dir, store) = test_store().await;

        store.update("acct", 6, 6, 10).await.unwrap();
        store.update("acct", 6, 3, 20).await.unwrap();
        store.update("acct", 6, 0, 30).await.unwrap();

        let record = store.read("acct").await.unwrap();
        assert_eq!(record.pending_orders, 0);
        assert_eq!(record.last_activity_time, 30);
    }

    #[test]
    fn sanitize_rewrites_path_separators() {
        assert_eq!(sanitize_account("../evil"), "___evil");
        assert_eq!(sanitize_account("store-1_a"), "store-1_a");
    }
}
