//! Ordered-list maintenance: the repositioning state machine and the
//! deferred per-episode correction queue.

pub mod engine;
pub mod queue;

pub use engine::{Reorder, ReorderOutcome, ReorderPhase};
pub use queue::{run_task, ReorderQueue, ReorderTask};
