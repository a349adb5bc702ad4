//! Repositioning algorithm over one episode's part list.
//!
//! Every operation runs as a single transaction and walks an explicit phase
//! sequence: `Idle → Locking → Shifting → Placing → Committed`, with any
//! failure ending in `RolledBack` (the transaction undoes all writes). Lock
//! contention during `Locking` surfaces as the typed retryable error so
//! callers can answer "temporarily unavailable" instead of a generic failure.
//!
//! Three shapes of reorder exist:
//!
//! - [`Reorder::make_room`]: open-ended `+1` shift at or above a target slot,
//!   then place a part there. Deferred path for creates that requested an
//!   arbitrary position.
//! - [`Reorder::move_part`]: bounded shift between a part's current and
//!   target positions, in the closing direction. Synchronous path for
//!   position updates; rows outside the closed interval never move.
//! - [`Reorder::close_gap`]: open-ended `-1` shift at or above a vacated
//!   position. Deferred path after a soft delete.

use crate::store::{
    positions, Engine, EpisodeId, PartId, PositionRange, RowKey, StoreError, StoreResult,
};

/// Phase of a reorder request, advanced as the transaction progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    Idle,
    Locking,
    Shifting,
    Placing,
    Committed,
    RolledBack,
}

/// Result of a committed reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Rows whose position changed, excluding the placed part.
    pub shifted: usize,
}

/// One reorder request against the store.
#[derive(Debug)]
pub struct Reorder<'e> {
    engine: &'e Engine,
    phase: ReorderPhase,
}

impl<'e> Reorder<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            phase: ReorderPhase::Idle,
        }
    }

    pub fn phase(&self) -> ReorderPhase {
        self.phase
    }

    /// Shift every live part of `episode_id` at or above `target` up by one,
    /// then place `part_id` at `target`. If the part was deleted while the
    /// request sat queued, the shift still closes ranks and placing is
    /// skipped.
    pub fn make_room(
        &mut self,
        episode_id: EpisodeId,
        part_id: PartId,
        target: i64,
    ) -> StoreResult<ReorderOutcome> {
        let engine = self.engine;
        let phase = &mut self.phase;
        let result = engine.transaction(|txn| {
            *phase = ReorderPhase::Locking;
            let ids = positions::lock_range(txn, episode_id, PositionRange::from(target))?;
            *phase = ReorderPhase::Shifting;
            let shifted = positions::shift_positions(txn, &ids, 1, Some(part_id))?;
            *phase = ReorderPhase::Placing;
            txn.lock(RowKey::Part(part_id))?;
            match txn.find_part(part_id) {
                Ok(part) => {
                    check_episode(&part, episode_id)?;
                    txn.update_part(part_id, |p| p.position = target)?;
                }
                Err(StoreError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
            Ok(shifted)
        });
        self.finish("make_room", result)
    }

    /// Move a live part to `target`, shifting exactly the parts between its
    /// current position and `target` by one slot in the closing direction.
    /// Moving a part onto its current position commits with zero shifts.
    pub fn move_part(
        &mut self,
        episode_id: EpisodeId,
        part_id: PartId,
        target: i64,
    ) -> StoreResult<ReorderOutcome> {
        let engine = self.engine;
        let phase = &mut self.phase;
        let result = engine.transaction(|txn| {
            txn.lock(RowKey::Part(part_id))?;
            let part = txn.find_part(part_id)?;
            check_episode(&part, episode_id)?;
            let current = part.position;
            if current == target {
                return Ok(0);
            }

            let (range, delta) = if target < current {
                (PositionRange::between(target, current - 1), 1)
            } else {
                (PositionRange::between(current + 1, target), -1)
            };
            *phase = ReorderPhase::Locking;
            let ids = positions::lock_range(txn, episode_id, range)?;
            *phase = ReorderPhase::Shifting;
            let shifted = positions::shift_positions(txn, &ids, delta, Some(part_id))?;
            *phase = ReorderPhase::Placing;
            txn.update_part(part_id, |p| p.position = target)?;
            Ok(shifted)
        });
        self.finish("move_part", result)
    }

    /// Shift every live part of `episode_id` at or above `from_position` down
    /// by one, closing the gap a deleted part left behind. No placing step.
    pub fn close_gap(
        &mut self,
        episode_id: EpisodeId,
        from_position: i64,
    ) -> StoreResult<ReorderOutcome> {
        let engine = self.engine;
        let phase = &mut self.phase;
        let result = engine.transaction(|txn| {
            *phase = ReorderPhase::Locking;
            let ids = positions::lock_range(txn, episode_id, PositionRange::from(from_position))?;
            *phase = ReorderPhase::Shifting;
            let shifted = positions::shift_positions(txn, &ids, -1, None)?;
            Ok(shifted)
        });
        self.finish("close_gap", result)
    }

    fn finish(&mut self, op: &'static str, result: StoreResult<usize>) -> StoreResult<ReorderOutcome> {
        match result {
            Ok(shifted) => {
                self.phase = ReorderPhase::Committed;
                tracing::debug!(op, shifted, "reorder committed");
                Ok(ReorderOutcome { shifted })
            }
            Err(err) => {
                self.phase = ReorderPhase::RolledBack;
                tracing::warn!(op, %err, "reorder rolled back");
                Err(err)
            }
        }
    }
}

fn check_episode(part: &crate::store::Part, episode_id: EpisodeId) -> StoreResult<()> {
    if part.episode_id != episode_id {
        return Err(StoreError::WrongEpisode {
            part: part.id.value(),
            episode: episode_id.value(),
        });
    }
    Ok(())
}
