//! Windowed batch scheduler for one run.
//!
//! A run walks its record sequence in fixed-size windows. Before each window
//! it observes the run's cancellation signal; within a window it fans each
//! record out into one submission per resolved variant, bounded to at most
//! `batch_size` concurrent in-flight submissions. The window boundary is a
//! barrier: progress is written and the inter-window delay starts only after
//! every submission in the window has returned, success or failure alike.
//!
//! Cancellation is cooperative and observed only at window boundaries. An
//! in-flight window and the delay that follows it always run to completion;
//! there is no mechanism to cancel a remote call already in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commerce::{CatalogMap, SubmitOrder};
use crate::error::AppError;
use crate::ingest::OrderRecord;
use crate::storage::ProgressStore;

// ─────────────────────────────────────────────────────────────────────────────
// RunOptions
// ─────────────────────────────────────────────────────────────────────────────

/// Tunable parameters for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Records per window; also the in-flight submission bound per window.
    pub batch_size: usize,
    /// Pause between windows, respecting the remote API's rate limits.
    pub inter_window_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            inter_window_delay: Duration::from_secs(15),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunState
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// All windows processed without cancellation.
    Completed,
    /// The cancellation signal was observed at a window boundary.
    Cancelled,
}

// ─────────────────────────────────────────────────────────────────────────────
// BatchRun
// ─────────────────────────────────────────────────────────────────────────────

/// One run of the batch scheduler for one account over one ingested file.
///
/// Exclusively owns its catalog map and record sequence; the only shared
/// state it touches is the progress store and the cancellation signal.
pub struct BatchRun {
    account: String,
    run_id: Uuid,
    catalog: CatalogMap,
    records: Vec<OrderRecord>,
    options: RunOptions,
    cancel: CancellationToken,
    submitter: Arc<dyn SubmitOrder>,
    progress: ProgressStore,
}

impl BatchRun {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account: String,
        run_id: Uuid,
        catalog: CatalogMap,
        records: Vec<OrderRecord>,
        options: RunOptions,
        cancel: CancellationToken,
        submitter: Arc<dyn SubmitOrder>,
        progress: ProgressStore,
    ) -> Self {
        Self {
            account,
            run_id,
            catalog,
            records,
            options,
            cancel,
            submitter,
            progress,
        }
    }

    /// Drives the run to a terminal state.
    pub async fn run(self) -> RunState {
        let batch_size = self.options.batch_size.max(1);
        let total = self.records.len() as u64;
        let window_count = self.records.len().div_ceil(batch_size);

        info!(
            "[RUN {}] Starting for account {}: {} records in {} windows of {}",
            self.run_id, self.account, total, window_count, batch_size
        );

        let mut processed = 0u64;
        for (index, window) in self.records.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    "[RUN {}] Cancelled for account {} before window {}/{}",
                    self.run_id,
                    self.account,
                    index + 1,
                    window_count
                );
                return RunState::Cancelled;
            }

            self.run_window(index + 1, window_count, window).await;

            // A record counts as processed once its window finishes, even if
            // every one of its submissions failed.
            processed += window.len() as u64;
            let pending = total - processed;
            if let Err(e) = self
                .progress
                .update(&self.account, total, pending, unix_timestamp())
                .await
            {
                warn!(
                    "[RUN {}] Progress update failed for account {}: {e}",
                    self.run_id, self.account
                );
            }

            // The delay itself is not interruptible; cancellation is only
            // observed at the next window boundary.
            if index + 1 < window_count {
                tokio::time::sleep(self.options.inter_window_delay).await;
            }
        }

        info!(
            "[RUN {}] Completed for account {}: {} records processed",
            self.run_id, self.account, processed
        );
        RunState::Completed
    }

    /// Executes every submission of one window and waits for all of them.
    async fn run_window(&self, window_number: usize, window_count: usize, window: &[OrderRecord]) {
        // One submission per (record, resolved variant). A record whose
        // product is absent from the catalog contributes no submissions.
        let mut submissions: Vec<(OrderRecord, u64)> = Vec::new();
        for record in window {
            match self.catalog.variants_for(record.product_ref) {
                Some(variants) => {
                    for &variant_id in variants {
                        submissions.push((record.clone(), variant_id));
                    }
                }
                None => {
                    info!(
                        "[RUN {}] Product {} not in catalog, skipping record",
                        self.run_id, record.product_ref
                    );
                }
            }
        }

        let limiter = Arc::new(Semaphore::new(self.options.batch_size.max(1)));
        let mut join_set: JoinSet<Result<u64, AppError>> = JoinSet::new();

        for (record, variant_id) in submissions {
            let limiter = limiter.clone();
            let submitter = self.submitter.clone();

            join_set.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(format!("submission limiter closed: {e}")))?;
                submitter.submit(&record, variant_id).await
            });
        }

        let mut succeeded = 0u64;
        let mut failed = 0u64;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Ok(_order_id)) => succeeded += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(
                        "[RUN {}] Submission failed in window {}/{}: {e}",
                        self.run_id, window_number, window_count
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        "[RUN {}] Submission task panicked in window {}/{}: {e}",
                        self.run_id, window_number, window_count
                    );
                }
            }
        }

        info!(
            "[RUN {}] Window {}/{} finished: {} submitted, {} failed",
            self.run_id, window_number, window_count, succeeded, failed
        );
    }
}

/// Current unix timestamp in seconds.
pub(crate) fn unix_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
