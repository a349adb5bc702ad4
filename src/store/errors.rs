//! Error types for the table store.
//!
//! Lock-wait timeouts and deadlocks surface as a single typed
//! [`StoreError::LockContention`] kind rather than an engine-specific error
//! string, so callers can branch on "retryable under contention" without
//! knowing anything about the lock manager.

use thiserror::Error;

use super::lock_table::RowKey;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A row lock could not be acquired within the active lock-wait timeout.
    /// Expected under load; safe to retry.
    #[error("lock wait timeout exceeded on {0}")]
    LockContention(RowKey),

    /// Referenced row does not exist or is soft-deleted.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A part operation referenced a part outside the given episode.
    #[error("part {part} does not belong to episode {episode}")]
    WrongEpisode { part: i64, episode: i64 },
}

impl StoreError {
    pub fn episode_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "episode",
            id,
        }
    }

    pub fn part_not_found(id: i64) -> Self {
        Self::NotFound { entity: "part", id }
    }

    /// Whether the failed operation may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::PartId;

    #[test]
    fn test_only_contention_is_retryable() {
        assert!(StoreError::LockContention(RowKey::Part(PartId(1))).is_retryable());
        assert!(!StoreError::part_not_found(1).is_retryable());
        assert!(!StoreError::WrongEpisode { part: 1, episode: 2 }.is_retryable());
    }

    #[test]
    fn test_not_found_message_names_entity() {
        assert_eq!(
            StoreError::episode_not_found(9).to_string(),
            "episode 9 not found"
        );
    }
}
