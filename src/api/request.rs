//! Request bodies and their validation.
//!
//! Validation happens here, before anything reaches the services: the core
//! never sees a missing or empty field. Field shapes follow the operation:
//! create takes an optional position, a full update requires both fields, a
//! sort takes only the position.

use serde::Deserialize;

use crate::service::{NewPart, PartUpdate};
use crate::store::EpisodeId;

use super::errors::{ApiError, ApiResult};

/// Body of `POST /episodes/parts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePartRequest {
    pub episode_id: i64,
    pub title: String,
    #[serde(default)]
    pub position: Option<i64>,
}

impl CreatePartRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_title(&self.title)
    }

    pub fn into_new_part(self) -> NewPart {
        NewPart {
            episode_id: EpisodeId(self.episode_id),
            title: self.title,
            position: self.position,
        }
    }
}

/// Body of `PUT /episodes/parts/{id}`. Both fields are required; a
/// position-only change goes through the sort endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePartRequest {
    pub title: String,
    pub position: i64,
}

impl UpdatePartRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_title(&self.title)
    }

    pub fn into_update(self) -> PartUpdate {
        PartUpdate {
            title: Some(self.title),
            position: Some(self.position),
        }
    }
}

/// Body of `PATCH /episodes/parts/sort/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SortPartRequest {
    pub position: i64,
}

/// Body of episode create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeRequest {
    pub title: String,
}

impl EpisodeRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_title(&self.title)
    }
}

/// Pagination query, 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

fn require_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_missing_position() {
        let req: CreatePartRequest =
            serde_json::from_str(r#"{"episode_id": 1, "title": "intro"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.position, None);
    }

    #[test]
    fn test_empty_title_rejected() {
        let req: CreatePartRequest =
            serde_json::from_str(r#"{"episode_id": 1, "title": "  "}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_requires_position() {
        let result: Result<UpdatePartRequest, _> =
            serde_json::from_str(r#"{"title": "intro"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_page_defaults_to_one() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
    }
}
