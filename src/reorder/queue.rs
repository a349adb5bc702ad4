//! Deferred reorder queue.
//!
//! Correction passes that nobody is waiting on (create-with-arbitrary-
//! position, delete-triggered gap closing) run here instead of inline. The
//! queue's one concurrency rule beyond the store's row locks: at most one
//! task per episode may be queued or running at a time. A second enqueue for
//! the same episode is suppressed and logged, not retried later, because
//! replaying a stale shift against moved state compounds the error instead
//! of fixing it. Failed tasks are likewise logged and dropped; the drift they
//! leave is repaired by the next reconciling operation on that episode.
//!
//! Tasks for different episodes run in parallel; the store rows they touch
//! are disjoint.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::store::{Engine, EpisodeId, PartId, StoreResult};

use super::engine::{Reorder, ReorderOutcome};

/// A queued correction pass over one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderTask {
    /// Shift parts at or above `target` up and place `part_id` there.
    MakeRoom {
        episode_id: EpisodeId,
        part_id: PartId,
        target: i64,
    },
    /// Shift parts at or above `from_position` down after a delete.
    CloseGap {
        episode_id: EpisodeId,
        from_position: i64,
    },
}

impl ReorderTask {
    pub fn episode_id(&self) -> EpisodeId {
        match self {
            ReorderTask::MakeRoom { episode_id, .. } => *episode_id,
            ReorderTask::CloseGap { episode_id, .. } => *episode_id,
        }
    }
}

/// Handle for enqueuing deferred reorders. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReorderQueue {
    sender: mpsc::UnboundedSender<ReorderTask>,
    in_flight: Arc<Mutex<HashSet<EpisodeId>>>,
}

impl ReorderQueue {
    /// Spawn the dispatcher on the current tokio runtime and return the
    /// enqueue handle.
    pub fn start(engine: Engine) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ReorderTask>();
        let in_flight: Arc<Mutex<HashSet<EpisodeId>>> = Arc::new(Mutex::new(HashSet::new()));

        let dispatcher_guard = Arc::clone(&in_flight);
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                let engine = engine.clone();
                let guard = Arc::clone(&dispatcher_guard);
                tokio::spawn(async move {
                    let episode_id = task.episode_id();
                    let result =
                        tokio::task::spawn_blocking(move || run_task(&engine, &task)).await;
                    match result {
                        Ok(Ok(outcome)) => {
                            tracing::debug!(%episode_id, shifted = outcome.shifted, "deferred reorder completed");
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(%episode_id, %err, "deferred reorder failed, dropping task");
                        }
                        Err(err) => {
                            tracing::error!(%episode_id, %err, "deferred reorder panicked");
                        }
                    }
                    guard.lock().remove(&episode_id);
                });
            }
        });

        Self { sender, in_flight }
    }

    /// Queue `task` unless its episode already has a task queued or running.
    /// Returns whether the task was accepted.
    pub fn enqueue(&self, task: ReorderTask) -> bool {
        let episode_id = task.episode_id();
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(episode_id) {
                tracing::warn!(%episode_id, "reorder already in flight for episode, suppressing");
                return false;
            }
        }
        if self.sender.send(task).is_err() {
            self.in_flight.lock().remove(&episode_id);
            tracing::error!(%episode_id, "reorder dispatcher gone, dropping task");
            return false;
        }
        true
    }

    /// Whether a task for `episode_id` is currently queued or running.
    pub fn in_flight(&self, episode_id: EpisodeId) -> bool {
        self.in_flight.lock().contains(&episode_id)
    }
}

/// Apply one task on the calling thread. The dispatcher calls this from the
/// blocking pool; tests may call it directly for deterministic ordering.
pub fn run_task(engine: &Engine, task: &ReorderTask) -> StoreResult<ReorderOutcome> {
    let mut reorder = Reorder::new(engine);
    match task {
        ReorderTask::MakeRoom {
            episode_id,
            part_id,
            target,
        } => reorder.make_room(*episode_id, *part_id, *target),
        ReorderTask::CloseGap {
            episode_id,
            from_position,
        } => reorder.close_gap(*episode_id, *from_position),
    }
}
