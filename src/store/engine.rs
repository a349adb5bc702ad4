//! Embedded table store.
//!
//! Holds the episode and part tables in memory and exposes the three
//! facilities the ordered-list protocol depends on:
//!
//! - transactions with full undo-log rollback
//! - exclusive row locks, acquired implicitly by every write
//! - an engine-wide lock-wait timeout, adjustable at runtime
//!
//! Reads inside a transaction see the current table state; isolation comes
//! from the writer discipline (every position-changing path locks the rows it
//! will touch before writing), not from snapshots. The part table carries no
//! unique index on `(episode_id, position)`: a transient duplicate between a
//! direct write and the deferred reconciliation pass is expected and must not
//! be rejected eagerly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use super::errors::{StoreError, StoreResult};
use super::lock_table::{LockTable, RowKey, TxnId};
use super::record::{Episode, EpisodeId, Part, PartId};

/// Engine-wide lock-wait timeout used when none is configured.
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(50);

#[derive(Debug)]
struct Tables {
    episodes: BTreeMap<EpisodeId, Episode>,
    parts: BTreeMap<PartId, Part>,
    next_episode_id: i64,
    next_part_id: i64,
}

impl Tables {
    fn new() -> Self {
        Self {
            episodes: BTreeMap::new(),
            parts: BTreeMap::new(),
            next_episode_id: 1,
            next_part_id: 1,
        }
    }
}

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    locks: LockTable,
    lock_wait_timeout: Mutex<Duration>,
    next_txn: AtomicU64,
}

/// Handle to the shared store. Cheap to clone; all clones see the same
/// tables, lock table, and lock-wait timeout.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_lock_wait_timeout(DEFAULT_LOCK_WAIT_TIMEOUT)
    }

    pub fn with_lock_wait_timeout(timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::new()),
                locks: LockTable::new(),
                lock_wait_timeout: Mutex::new(timeout),
                next_txn: AtomicU64::new(1),
            }),
        }
    }

    /// Current engine-wide lock-wait timeout.
    pub fn lock_wait_timeout(&self) -> Duration {
        *self.shared.lock_wait_timeout.lock()
    }

    /// Replace the engine-wide lock-wait timeout; affects every later lock
    /// wait not covered by a session lock window.
    pub fn set_lock_wait_timeout(&self, timeout: Duration) {
        *self.shared.lock_wait_timeout.lock() = timeout;
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls every write back
    /// on `Err`. Row locks are held until either outcome.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Txn<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let mut txn = Txn::begin(self);
        match f(&mut txn) {
            Ok(value) => {
                txn.commit();
                Ok(value)
            }
            Err(err) => {
                txn.rollback();
                Err(err)
            }
        }
    }

    /// Like [`Engine::transaction`], but retries the whole transaction up to
    /// `attempts` times when it fails with a retryable contention error.
    pub fn transaction_with_retries<T>(
        &self,
        attempts: u32,
        mut f: impl FnMut(&mut Txn<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transaction(&mut f) {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(attempt, %err, "transaction hit contention, retrying");
                }
                outcome => return outcome,
            }
        }
    }

    // Plain reads, outside any transaction. Soft-deleted rows are invisible.

    pub fn get_episode(&self, id: EpisodeId) -> Option<Episode> {
        let tables = self.shared.tables.lock();
        tables.episodes.get(&id).filter(|e| !e.is_deleted()).cloned()
    }

    pub fn get_part(&self, id: PartId) -> Option<Part> {
        let tables = self.shared.tables.lock();
        tables.parts.get(&id).filter(|p| !p.is_deleted()).cloned()
    }

    /// Live episodes in id order; returns the requested window and the total
    /// live count.
    pub fn list_episodes(&self, offset: usize, limit: usize) -> (Vec<Episode>, usize) {
        let tables = self.shared.tables.lock();
        let live: Vec<Episode> = tables
            .episodes
            .values()
            .filter(|e| !e.is_deleted())
            .cloned()
            .collect();
        let total = live.len();
        (live.into_iter().skip(offset).take(limit).collect(), total)
    }

    /// Live parts in id order; returns the requested window and the total
    /// live count.
    pub fn list_parts(&self, offset: usize, limit: usize) -> (Vec<Part>, usize) {
        let tables = self.shared.tables.lock();
        let live: Vec<Part> = tables
            .parts
            .values()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        let total = live.len();
        (live.into_iter().skip(offset).take(limit).collect(), total)
    }

    /// Live parts of one episode, ordered by position.
    pub fn parts_of_episode(&self, episode_id: EpisodeId) -> Vec<Part> {
        let tables = self.shared.tables.lock();
        let mut parts: Vec<Part> = tables
            .parts
            .values()
            .filter(|p| p.episode_id == episode_id && !p.is_deleted())
            .cloned()
            .collect();
        parts.sort_by_key(|p| (p.position, p.id));
        parts
    }
}

/// Undo record for one touched row: the row's state before this transaction
/// first wrote it (`None` for rows this transaction inserted).
#[derive(Debug)]
enum Undo {
    Episode(EpisodeId, Option<Episode>),
    Part(PartId, Option<Part>),
}

/// An open transaction. Dropped without commit, it rolls back.
#[derive(Debug)]
pub struct Txn<'e> {
    engine: &'e Engine,
    id: TxnId,
    undo: Vec<Undo>,
    finished: bool,
}

impl<'e> Txn<'e> {
    fn begin(engine: &'e Engine) -> Self {
        let id = TxnId(engine.shared.next_txn.fetch_add(1, Ordering::Relaxed));
        Self {
            engine,
            id,
            undo: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Acquire an exclusive lock on `key`, waiting up to the session's
    /// effective lock-wait timeout. Held until commit or rollback.
    pub fn lock(&mut self, key: RowKey) -> StoreResult<()> {
        let timeout = self.engine.effective_lock_wait_timeout();
        self.engine.shared.locks.acquire(self.id, key, timeout)?;
        Ok(())
    }

    /// Live episode by id.
    pub fn find_episode(&self, id: EpisodeId) -> StoreResult<Episode> {
        let tables = self.engine.shared.tables.lock();
        tables
            .episodes
            .get(&id)
            .filter(|e| !e.is_deleted())
            .cloned()
            .ok_or_else(|| StoreError::episode_not_found(id.value()))
    }

    /// Live part by id.
    pub fn find_part(&self, id: PartId) -> StoreResult<Part> {
        let tables = self.engine.shared.tables.lock();
        tables
            .parts
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned()
            .ok_or_else(|| StoreError::part_not_found(id.value()))
    }

    /// Live parts of one episode, ordered by position.
    pub fn live_parts(&self, episode_id: EpisodeId) -> Vec<Part> {
        let tables = self.engine.shared.tables.lock();
        let mut parts: Vec<Part> = tables
            .parts
            .values()
            .filter(|p| p.episode_id == episode_id && !p.is_deleted())
            .cloned()
            .collect();
        parts.sort_by_key(|p| (p.position, p.id));
        parts
    }

    pub fn insert_episode(&mut self, title: &str) -> StoreResult<Episode> {
        let id = {
            let mut tables = self.engine.shared.tables.lock();
            let id = EpisodeId(tables.next_episode_id);
            tables.next_episode_id += 1;
            id
        };
        // Lock the fresh row so range scanners block until we commit.
        self.lock(RowKey::Episode(id))?;
        let episode = Episode::new(id, title);
        let mut tables = self.engine.shared.tables.lock();
        self.undo.push(Undo::Episode(id, None));
        tables.episodes.insert(id, episode.clone());
        Ok(episode)
    }

    pub fn insert_part(
        &mut self,
        episode_id: EpisodeId,
        title: &str,
        position: i64,
    ) -> StoreResult<Part> {
        let id = {
            let mut tables = self.engine.shared.tables.lock();
            let id = PartId(tables.next_part_id);
            tables.next_part_id += 1;
            id
        };
        self.lock(RowKey::Part(id))?;
        let part = Part::new(id, episode_id, title, position);
        let mut tables = self.engine.shared.tables.lock();
        self.undo.push(Undo::Part(id, None));
        tables.parts.insert(id, part.clone());
        Ok(part)
    }

    /// Lock and mutate a live episode row.
    pub fn update_episode(
        &mut self,
        id: EpisodeId,
        f: impl FnOnce(&mut Episode),
    ) -> StoreResult<Episode> {
        self.lock(RowKey::Episode(id))?;
        let mut tables = self.engine.shared.tables.lock();
        let row = tables
            .episodes
            .get_mut(&id)
            .filter(|e| !e.is_deleted())
            .ok_or_else(|| StoreError::episode_not_found(id.value()))?;
        self.undo.push(Undo::Episode(id, Some(row.clone())));
        f(row);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    /// Lock and mutate a live part row.
    pub fn update_part(&mut self, id: PartId, f: impl FnOnce(&mut Part)) -> StoreResult<Part> {
        self.lock(RowKey::Part(id))?;
        let mut tables = self.engine.shared.tables.lock();
        let row = tables
            .parts
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| StoreError::part_not_found(id.value()))?;
        self.undo.push(Undo::Part(id, Some(row.clone())));
        f(row);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    /// Soft-delete a live episode row.
    pub fn soft_delete_episode(&mut self, id: EpisodeId) -> StoreResult<Episode> {
        self.update_episode(id, |e| e.deleted_at = Some(Utc::now()))
    }

    /// Soft-delete a live part row. Returns the row as it was stamped, so
    /// callers can read the vacated position.
    pub fn soft_delete_part(&mut self, id: PartId) -> StoreResult<Part> {
        self.update_part(id, |p| p.deleted_at = Some(Utc::now()))
    }

    fn commit(mut self) {
        self.undo.clear();
        self.finished = true;
        self.engine.shared.locks.release_all(self.id);
    }

    fn rollback(mut self) {
        self.rollback_in_place();
    }

    fn rollback_in_place(&mut self) {
        if self.finished {
            return;
        }
        let mut tables = self.engine.shared.tables.lock();
        // Reverse order so the earliest snapshot of a row touched twice wins.
        for undo in self.undo.drain(..).rev() {
            match undo {
                Undo::Episode(id, Some(prev)) => {
                    tables.episodes.insert(id, prev);
                }
                Undo::Episode(id, None) => {
                    tables.episodes.remove(&id);
                }
                Undo::Part(id, Some(prev)) => {
                    tables.parts.insert(id, prev);
                }
                Undo::Part(id, None) => {
                    tables.parts.remove(&id);
                }
            }
        }
        drop(tables);
        self.finished = true;
        self.engine.shared.locks.release_all(self.id);
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        // A transaction abandoned mid-flight (including by panic) rolls back.
        self.rollback_in_place();
    }
}
