//! File-backed persistence for run progress.
//!
//! Progress records are small per-account JSON files written atomically, so
//! concurrent readers across runs never observe a partially written record.

mod atomic;
mod progress;

pub use atomic::write_json_atomic;
pub use progress::{ProgressRecord, ProgressStore};
