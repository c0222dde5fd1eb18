//! Run lifecycle: the per-account registry of active runs and the windowed
//! batch scheduler that drives one run to completion or cancellation.

mod registry;
mod scheduler;

pub use registry::RunRegistry;
pub use scheduler::{BatchRun, RunOptions, RunState};
