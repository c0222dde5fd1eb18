//! ordersurge: batch order submission engine.
//!
//! Ingests CSV purchase records, resolves them against a store's remote
//! product catalog, and submits orders in paced windows of bounded
//! concurrency. Runs are per-account, cancellable at window boundaries,
//! and report durable progress after every window.

pub mod commerce;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod run;
pub mod storage;

pub use engine::{CommerceOps, HttpCommerce, OrderEngine, RunStarted};
pub use error::AppError;
pub use run::{RunOptions, RunState};
pub use storage::{ProgressRecord, ProgressStore};
