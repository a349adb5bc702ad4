//! Episode CRUD. No ordering logic lives here; an episode is just the parent
//! scope the part list hangs off.

use crate::store::{Engine, Episode, EpisodeId, StoreError, StoreResult};

/// Service for episode create/read/update/delete.
#[derive(Debug, Clone)]
pub struct EpisodeService {
    engine: Engine,
}

impl EpisodeService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn create_episode(&self, title: &str) -> StoreResult<Episode> {
        self.engine.transaction(|txn| txn.insert_episode(title))
    }

    pub fn update_episode(&self, id: EpisodeId, title: &str) -> StoreResult<Episode> {
        self.engine
            .transaction(|txn| txn.update_episode(id, |e| e.title = title.to_string()))
    }

    /// Soft-delete an episode. Its parts stay in place; they are hidden
    /// behind the deleted parent rather than individually deleted.
    pub fn delete_episode(&self, id: EpisodeId) -> StoreResult<Episode> {
        self.engine.transaction(|txn| txn.soft_delete_episode(id))
    }

    pub fn get_episode(&self, id: EpisodeId) -> StoreResult<Episode> {
        self.engine
            .get_episode(id)
            .ok_or_else(|| StoreError::episode_not_found(id.value()))
    }

    /// One page of live episodes plus the total live count.
    pub fn list_episodes(&self, page: usize, per_page: usize) -> (Vec<Episode>, usize) {
        let offset = page.saturating_sub(1) * per_page;
        self.engine.list_episodes(offset, per_page)
    }
}
