//! Part lifecycle orchestration.
//!
//! Chooses synchronous versus deferred reconciliation per operation:
//!
//! - create at the natural next slot needs no reconciliation at all;
//! - create at an arbitrary slot defers a `make_room` pass (the caller
//!   already has its row, contiguity can catch up);
//! - a position update runs `move_part` inline inside the tight lock window,
//!   because the caller is waiting and wants either a prompt result or a
//!   prompt "temporarily unavailable";
//! - delete defers a `close_gap` pass.

use std::time::Duration;

use crate::reorder::{Reorder, ReorderQueue, ReorderTask};
use crate::store::{Engine, EpisodeId, Part, PartId, StoreResult};
use crate::store::{positions, DEFAULT_TIGHT_WINDOW};

/// Transaction attempts for create and delete under contention.
const WRITE_ATTEMPTS: u32 = 3;

/// Fields for creating a part.
#[derive(Debug, Clone)]
pub struct NewPart {
    pub episode_id: EpisodeId,
    pub title: String,
    /// Explicit slot; omitted means "append at the next available position".
    pub position: Option<i64>,
}

/// Fields for updating a part. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PartUpdate {
    pub title: Option<String>,
    pub position: Option<i64>,
}

/// Service for part create/update/delete/sort.
#[derive(Debug, Clone)]
pub struct PartService {
    engine: Engine,
    queue: ReorderQueue,
    tight_window: Duration,
}

impl PartService {
    pub fn new(engine: Engine, queue: ReorderQueue) -> Self {
        Self::with_tight_window(engine, queue, DEFAULT_TIGHT_WINDOW)
    }

    pub fn with_tight_window(engine: Engine, queue: ReorderQueue, tight_window: Duration) -> Self {
        Self {
            engine,
            queue,
            tight_window,
        }
    }

    /// Create a part. Without an explicit position the part lands at
    /// `max(position) + 1` (1 for an empty episode), computed in the same
    /// transaction as the insert. An explicit position that is not the next
    /// available slot queues a deferred `make_room` pass.
    pub fn create_part(&self, new: NewPart) -> StoreResult<Part> {
        let (part, available) = self
            .engine
            .transaction_with_retries(WRITE_ATTEMPTS, |txn| {
                txn.find_episode(new.episode_id)?;
                let available = positions::next_available_position(txn, new.episode_id);
                let position = new.position.unwrap_or(available);
                let part = txn.insert_part(new.episode_id, &new.title, position)?;
                Ok((part, available))
            })?;

        if let Some(requested) = new.position {
            if requested != available {
                self.queue.enqueue(ReorderTask::MakeRoom {
                    episode_id: part.episode_id,
                    part_id: part.id,
                    target: requested,
                });
            }
        }
        Ok(part)
    }

    /// Update a part's title and/or position. The single-row write and any
    /// inline repositioning both run inside the tight lock window, so under
    /// contention the call fails fast with the retryable error instead of
    /// queuing on row locks for the engine's full default timeout.
    pub fn update_part(&self, id: PartId, update: PartUpdate) -> StoreResult<Part> {
        self.engine
            .with_tight_lock_window(self.tight_window, |engine| {
                let part = engine.transaction(|txn| {
                    txn.update_part(id, |p| {
                        if let Some(title) = &update.title {
                            p.title = title.clone();
                        }
                    })
                })?;

                if let Some(target) = update.position {
                    if target != part.position {
                        Reorder::new(engine).move_part(part.episode_id, id, target)?;
                    }
                }

                engine
                    .get_part(id)
                    .ok_or_else(|| crate::store::StoreError::part_not_found(id.value()))
            })
    }

    /// Soft-delete a part and queue a deferred pass that renumbers the parts
    /// above its vacated position.
    pub fn delete_part(&self, id: PartId) -> StoreResult<Part> {
        let part = self
            .engine
            .transaction_with_retries(WRITE_ATTEMPTS, |txn| txn.soft_delete_part(id))?;

        self.queue.enqueue(ReorderTask::CloseGap {
            episode_id: part.episode_id,
            from_position: part.position,
        });
        Ok(part)
    }

    /// Reposition a part. Same path as a position-only update; the distinct
    /// entry point exists for the API surface, not for a separate algorithm.
    pub fn sort_part(&self, id: PartId, position: i64) -> StoreResult<Part> {
        self.update_part(
            id,
            PartUpdate {
                title: None,
                position: Some(position),
            },
        )
    }

    pub fn get_part(&self, id: PartId) -> StoreResult<Part> {
        self.engine
            .get_part(id)
            .ok_or_else(|| crate::store::StoreError::part_not_found(id.value()))
    }

    /// One page of live parts plus the total live count.
    pub fn list_parts(&self, page: usize, per_page: usize) -> (Vec<Part>, usize) {
        let offset = page.saturating_sub(1) * per_page;
        self.engine.list_parts(offset, per_page)
    }
}
