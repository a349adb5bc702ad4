//! Exclusive row-lock manager.
//!
//! Locks are logical: they guard rows by key, not by holding any table
//! memory. A transaction that finds a key held by another transaction waits
//! on a condvar up to the caller-supplied timeout, then fails with the typed
//! contention error. Re-acquiring a key the same transaction already holds is
//! a no-op, matching the reentrancy of engine row locks.
//!
//! There is no deadlock detector; a cycle resolves when one participant's
//! wait times out and its transaction rolls back.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::errors::{StoreError, StoreResult};
use super::record::{EpisodeId, PartId};

/// Transaction identity, used only as the lock owner token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnId(pub u64);

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Key of a lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Episode(EpisodeId),
    Part(PartId),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Episode(id) => write!(f, "episodes/{}", id),
            RowKey::Part(id) => write!(f, "parts/{}", id),
        }
    }
}

/// Table of currently held row locks.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashMap<RowKey, TxnId>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire an exclusive lock on `key` for `owner`, waiting up to
    /// `timeout`. Returns `Ok(true)` if the lock was newly acquired,
    /// `Ok(false)` if `owner` already held it.
    pub fn acquire(&self, owner: TxnId, key: RowKey, timeout: Duration) -> StoreResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        loop {
            match held.get(&key) {
                None => {
                    held.insert(key, owner);
                    return Ok(true);
                }
                Some(current) if *current == owner => return Ok(false),
                Some(_) => {
                    if self.released.wait_until(&mut held, deadline).timed_out() {
                        return Err(StoreError::LockContention(key));
                    }
                }
            }
        }
    }

    /// Release every lock held by `owner` and wake all waiters.
    pub fn release_all(&self, owner: TxnId) {
        let mut held = self.held.lock();
        held.retain(|_, current| *current != owner);
        drop(held);
        self.released.notify_all();
    }

    /// Whether `owner` currently holds `key`.
    pub fn holds(&self, owner: TxnId, key: RowKey) -> bool {
        self.held.lock().get(&key) == Some(&owner)
    }
}
