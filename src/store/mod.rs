//! Table store for episodes and their ordered parts.
//!
//! Layers, bottom up:
//!
//! - [`lock_table`]: exclusive row locks with timed waits
//! - [`engine`]: in-memory tables, transactions with undo-log rollback
//! - [`positions`]: position reads, range locks, and bulk shifts
//! - [`lock_window`]: scoped tightening of the lock-wait timeout

pub mod engine;
pub mod errors;
pub mod lock_table;
pub mod lock_window;
pub mod positions;
pub mod record;

pub use engine::{Engine, Txn, DEFAULT_LOCK_WAIT_TIMEOUT};
pub use errors::{StoreError, StoreResult};
pub use lock_table::{LockTable, RowKey, TxnId};
pub use lock_window::{LockWindow, DEFAULT_TIGHT_WINDOW};
pub use positions::PositionRange;
pub use record::{Episode, EpisodeId, Part, PartId};
