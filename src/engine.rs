//! Engine facade: the external surface for starting, stopping, and
//! observing batch order submission runs.
//!
//! `start_run` validates and ingests the upload, resolves the catalog, and
//! spawns the run fire-and-forget: the caller gets control back immediately
//! while the run proceeds on its own task. The spawned task's handle is
//! retained in the run registry so its lifetime stays observable.

use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::commerce::orders::OrderClient;
use crate::commerce::{
    fetch_catalog, AccountDirectory, CatalogMap, CommerceClient, StoreCredentials, SubmitOrder,
};
use crate::error::AppError;
use crate::ingest::parse_records;
use crate::run::{BatchRun, RunOptions, RunRegistry};
use crate::storage::{ProgressRecord, ProgressStore};

// ─────────────────────────────────────────────────────────────────────────────
// CommerceOps Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait seam over the remote commerce API, allowing test fakes.
///
/// The real implementation is [`HttpCommerce`]; tests provide fakes that
/// never touch the network.
pub trait CommerceOps: Send + Sync {
    /// Resolves the full product catalog for a store.
    fn fetch_catalog<'a>(
        &'a self,
        creds: &'a StoreCredentials,
    ) -> Pin<Box<dyn Future<Output = Result<CatalogMap, AppError>> + Send + 'a>>;

    /// Builds the order submitter for a store.
    fn submitter(&self, creds: &StoreCredentials) -> Result<Arc<dyn SubmitOrder>, AppError>;
}

/// Real commerce surface backed by HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpCommerce {
    submission_timeout: Duration,
}

impl HttpCommerce {
    pub fn new() -> Self {
        Self {
            submission_timeout: crate::commerce::orders::DEFAULT_SUBMISSION_TIMEOUT,
        }
    }

    /// Overrides the per-submission timeout applied to order creation.
    pub fn with_submission_timeout(mut self, timeout: Duration) -> Self {
        self.submission_timeout = timeout;
        self
    }
}

impl Default for HttpCommerce {
    fn default() -> Self {
        Self::new()
    }
}

impl CommerceOps for HttpCommerce {
    fn fetch_catalog<'a>(
        &'a self,
        creds: &'a StoreCredentials,
    ) -> Pin<Box<dyn Future<Output = Result<CatalogMap, AppError>> + Send + 'a>> {
        Box::pin(async move {
            let client = CommerceClient::new(creds.clone())?;
            fetch_catalog(&client).await
        })
    }

    fn submitter(&self, creds: &StoreCredentials) -> Result<Arc<dyn SubmitOrder>, AppError> {
        let client = CommerceClient::new(creds.clone())?;
        Ok(Arc::new(
            OrderClient::new(client).with_timeout(self.submission_timeout),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OrderEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Acknowledgement returned as soon as a run has been started.
#[derive(Debug, Clone)]
pub struct RunStarted {
    pub account: String,
    pub run_id: Uuid,
    pub total_orders: u64,
}

/// Batch order submission engine.
///
/// Collaborators are injected rather than reached as ambient globals: the
/// account directory supplies credentials, the commerce surface supplies
/// catalog and submission access, and the progress store persists per-window
/// statistics.
pub struct OrderEngine {
    directory: Arc<dyn AccountDirectory>,
    commerce: Arc<dyn CommerceOps>,
    registry: Arc<RunRegistry>,
    progress: ProgressStore,
    defaults: RunOptions,
}

impl OrderEngine {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        commerce: Arc<dyn CommerceOps>,
        progress: ProgressStore,
    ) -> Self {
        Self {
            directory,
            commerce,
            registry: Arc::new(RunRegistry::new()),
            progress,
            defaults: RunOptions::default(),
        }
    }

    /// Overrides the run options applied when `start_run` receives none.
    pub fn with_default_options(mut self, options: RunOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Ingests an uploaded file, resolves the catalog, and starts a run for
    /// the account. Returns as soon as the run task is spawned.
    ///
    /// # Errors
    ///
    /// Fails fast, before any registry entry or progress write, with:
    /// - [`AppError::UnknownAccount`] if the directory has no credentials
    /// - [`AppError::MalformedRecord`] if ingestion rejects the upload
    /// - [`AppError::CatalogFetchFailed`] if the catalog cannot be resolved
    ///   or resolves to nothing
    /// - [`AppError::RunAlreadyActive`] if the account already has a live run
    pub async fn start_run(
        &self,
        account: &str,
        upload: impl Read,
        options: Option<RunOptions>,
    ) -> Result<RunStarted, AppError> {
        let creds = self
            .directory
            .lookup(account)
            .ok_or_else(|| AppError::UnknownAccount {
                account: account.to_string(),
            })?;

        let records = parse_records(upload)?;

        let catalog = self.commerce.fetch_catalog(&creds).await?;
        if catalog.is_empty() {
            return Err(AppError::CatalogFetchFailed {
                message: "catalog resolved no products".to_string(),
            });
        }

        let submitter = self.commerce.submitter(&creds)?;
        let cancel = self.registry.begin(account).await?;

        let run_id = Uuid::new_v4();
        let total_orders = records.len() as u64;
        let run = BatchRun::new(
            account.to_string(),
            run_id,
            catalog,
            records,
            options.unwrap_or(self.defaults),
            cancel,
            submitter,
            self.progress.clone(),
        );

        let handle = tokio::spawn(async move {
            run.run().await;
        });
        self.registry.attach(account, handle).await;

        info!(
            "[ENGINE] Run {} started for account {}: {} records",
            run_id, account, total_orders
        );

        Ok(RunStarted {
            account: account.to_string(),
            run_id,
            total_orders,
        })
    }

    /// Requests cancellation of the account's active run.
    ///
    /// Returns `false` if no run is registered. Cancellation takes effect at
    /// the run's next window boundary, not immediately.
    pub async fn stop_run(&self, account: &str) -> bool {
        let stopped = self.registry.request_stop(account).await;
        if stopped {
            info!("[ENGINE] Stop requested for account {account}");
        }
        stopped
    }

    /// The most recent persisted progress for an account, if any.
    pub async fn get_progress(&self, account: &str) -> Option<ProgressRecord> {
        self.progress.read(account).await
    }

    /// Persisted progress for every account.
    pub async fn all_progress(
        &self,
    ) -> std::collections::HashMap<String, ProgressRecord> {
        self.progress.read_all().await
    }

    /// Whether the account currently has a live run.
    pub async fn is_running(&self, account: &str) -> bool {
        self.registry.is_active(account).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
