//! Position Store: ordered-position reads and bulk shifts over the part
//! table, all scoped to one episode and one enclosing transaction.
//!
//! `lock_range` is the serialization point for concurrent reorders: two
//! transactions shifting overlapping ranges of the same episode collide on
//! row locks here and one of them waits (or times out).

use super::engine::Txn;
use super::errors::StoreResult;
use super::lock_table::RowKey;
use super::record::{EpisodeId, PartId};

/// Half-open-ended position range `[min, max]`; `max = None` means unbounded
/// above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub min: i64,
    pub max: Option<i64>,
}

impl PositionRange {
    /// Everything at or above `min`.
    pub fn from(min: i64) -> Self {
        Self { min, max: None }
    }

    /// Inclusive `[min, max]`.
    pub fn between(min: i64, max: i64) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn contains(&self, position: i64) -> bool {
        position >= self.min && self.max.map_or(true, |max| position <= max)
    }
}

/// Next free slot at the end of the episode's list: `max(position) + 1` over
/// live parts, or 1 for an empty episode. Must be called inside the same
/// transaction as the insert that uses it.
pub fn next_available_position(txn: &Txn<'_>, episode_id: EpisodeId) -> i64 {
    txn.live_parts(episode_id)
        .iter()
        .map(|p| p.position)
        .max()
        .map_or(1, |max| max + 1)
}

/// Exclusively lock every live part of `episode_id` whose position falls in
/// `range`. Positions can move while we wait on a lock, so the scan repeats
/// after each acquisition round until no unlocked matching row remains. The
/// returned ids are the stable locked set, in ascending id order.
pub fn lock_range(
    txn: &mut Txn<'_>,
    episode_id: EpisodeId,
    range: PositionRange,
) -> StoreResult<Vec<PartId>> {
    let mut locked: Vec<PartId> = Vec::new();
    loop {
        let matching: Vec<PartId> = txn
            .live_parts(episode_id)
            .iter()
            .filter(|p| range.contains(p.position))
            .map(|p| p.id)
            .collect();

        let missing: Vec<PartId> = matching
            .iter()
            .copied()
            .filter(|id| !locked.contains(id))
            .collect();
        if missing.is_empty() {
            locked.retain(|id| matching.contains(id));
            locked.sort();
            return Ok(locked);
        }
        // Ascending id order keeps concurrent range lockers from meeting
        // head-on in the common case.
        for id in missing {
            txn.lock(RowKey::Part(id))?;
            locked.push(id);
        }
    }
}

/// Add `delta` (±1) to the position of every locked row in `ids`, skipping
/// `exclude` (the part being re-placed explicitly by the caller). Returns the
/// number of rows shifted. Callers must hold the locks, i.e. pass the result
/// of [`lock_range`].
pub fn shift_positions(
    txn: &mut Txn<'_>,
    ids: &[PartId],
    delta: i64,
    exclude: Option<PartId>,
) -> StoreResult<usize> {
    let mut shifted = 0;
    for id in ids {
        if Some(*id) == exclude {
            continue;
        }
        txn.update_part(*id, |p| p.position += delta)?;
        shifted += 1;
    }
    Ok(shifted)
}
