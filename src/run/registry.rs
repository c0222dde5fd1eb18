//! Process-wide table of active runs, keyed by account.
//!
//! Each entry holds the run's cancellation token and the spawned task's
//! handle, so a fire-and-forget run stays observable. At most one active run
//! per account: starting a second run while the first is live is rejected
//! rather than silently replacing (and orphaning) its cancellation signal.
//!
//! Entries are NOT removed when a run completes on its own; only an explicit
//! stop request removes them. A finished entry no longer counts as active
//! and does not block a later run for the same account.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// RunRegistry
// ─────────────────────────────────────────────────────────────────────────────

struct RunEntry {
    token: CancellationToken,
    /// Attached right after the run task is spawned. An entry without a
    /// handle is a run still being started and counts as active.
    handle: Option<JoinHandle<()>>,
}

impl RunEntry {
    fn is_active(&self) -> bool {
        match &self.handle {
            Some(handle) => !handle.is_finished(),
            None => true,
        }
    }
}

/// Registry of run cancellation signals, keyed by account.
#[derive(Default)]
pub struct RunRegistry {
    entries: Mutex<HashMap<String, RunEntry>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh cancellation signal for an account and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RunAlreadyActive`] if the account already has a
    /// live run.
    pub async fn begin(&self, account: &str) -> Result<CancellationToken, AppError> {
        let mut guard = self.entries.lock().await;

        if let Some(entry) = guard.get(account) {
            if entry.is_active() {
                return Err(AppError::RunAlreadyActive {
                    account: account.to_string(),
                });
            }
        }

        let token = CancellationToken::new();
        guard.insert(
            account.to_string(),
            RunEntry {
                token: token.clone(),
                handle: None,
            },
        );
        Ok(token)
    }

    /// Attaches the spawned run task's handle to the account's entry.
    pub async fn attach(&self, account: &str, handle: JoinHandle<()>) {
        let mut guard = self.entries.lock().await;
        if let Some(entry) = guard.get_mut(account) {
            entry.handle = Some(handle);
        }
    }

    /// Requests cancellation of the account's run and removes its entry.
    ///
    /// Returns whether an entry existed. Cancellation is cooperative: the
    /// run observes the signal at its next window boundary.
    pub async fn request_stop(&self, account: &str) -> bool {
        let mut guard = self.entries.lock().await;
        match guard.remove(account) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// The cancellation signal for an account's run, if one is registered.
    pub async fn signal_for(&self, account: &str) -> Option<CancellationToken> {
        let guard = self.entries.lock().await;
        guard.get(account).map(|entry| entry.token.clone())
    }

    /// Whether the account currently has a live run.
    pub async fn is_active(&self, account: &str) -> bool {
        let guard = self.entries.lock().await;
        guard.get(account).is_some_and(|entry| entry.is_active())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
