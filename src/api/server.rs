//! Axum HTTP server for the episode/part API.
//!
//! Handlers are thin: validate the body, hop to the blocking pool (service
//! calls can wait on row locks), translate the result. Route shapes:
//!
//! - `GET    /episodes`                 list, paginated
//! - `POST   /episodes/store`           create episode
//! - `GET    /episodes/:id`             show episode
//! - `PUT    /episodes/:id`             update episode
//! - `DELETE /episodes/:id`             soft-delete episode
//! - `GET    /episodes/parts`           list parts, paginated
//! - `POST   /episodes/parts`           create part
//! - `GET    /episodes/parts/:id`       show part
//! - `PUT    /episodes/parts/:id`       update part (title + position)
//! - `PATCH  /episodes/parts/sort/:id`  reposition part
//! - `DELETE /episodes/parts/:id`       soft-delete part

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::reorder::ReorderQueue;
use crate::service::{EpisodeService, PartService};
use crate::store::{Engine, Episode, EpisodeId, Part, PartId, StoreResult};

use super::errors::{ApiError, ApiResult};
use super::request::{
    CreatePartRequest, EpisodeRequest, PageQuery, SortPartRequest, UpdatePartRequest,
};
use super::response::{ListResponse, MessageResponse, SingleResponse};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub parts: PartService,
    pub episodes: EpisodeService,
    pub per_page: usize,
}

impl AppState {
    pub fn new(engine: Engine, queue: ReorderQueue, config: &Config) -> Self {
        Self {
            parts: PartService::with_tight_window(engine.clone(), queue, config.tight_window()),
            episodes: EpisodeService::new(engine),
            per_page: config.per_page,
        }
    }
}

type ServerState = Arc<AppState>;

/// Build the router over `state`.
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/episodes", get(list_episodes))
        .route("/episodes/store", post(create_episode))
        .route("/episodes/parts", get(list_parts).post(create_part))
        .route("/episodes/parts/sort/:id", patch(sort_part))
        .route(
            "/episodes/parts/:id",
            get(get_part).put(update_part).delete(delete_part),
        )
        .route(
            "/episodes/:id",
            get(get_episode).put(update_episode).delete(delete_episode),
        )
        .layer(cors)
        .with_state(state)
}

/// Boot the store, queue, and server from `config` and serve until shutdown.
pub async fn serve(config: Config) -> std::io::Result<()> {
    let engine = Engine::with_lock_wait_timeout(config.lock_wait_timeout());
    let queue = ReorderQueue::start(engine.clone());
    let state = Arc::new(AppState::new(engine, queue, &config));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "partwise listening");
    axum::serve(listener, router(state)).await
}

/// Run a service call on the blocking pool; lock waits must not stall the
/// async runtime.
async fn run_blocking<T: Send + 'static>(
    f: impl FnOnce() -> StoreResult<T> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

// Episode handlers

async fn list_episodes(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListResponse<Episode>>> {
    let page = query.page;
    let per_page = state.per_page;
    let (episodes, total) =
        run_blocking(move || Ok(state.episodes.list_episodes(page, per_page))).await?;
    Ok(Json(ListResponse::new(episodes, page, per_page, total)))
}

async fn create_episode(
    State(state): State<ServerState>,
    Json(req): Json<EpisodeRequest>,
) -> ApiResult<(StatusCode, Json<SingleResponse<Episode>>)> {
    req.validate()?;
    let episode = run_blocking(move || state.episodes.create_episode(&req.title)).await?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(episode))))
}

async fn get_episode(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SingleResponse<Episode>>> {
    let episode = run_blocking(move || state.episodes.get_episode(EpisodeId(id))).await?;
    Ok(Json(SingleResponse::new(episode)))
}

async fn update_episode(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<EpisodeRequest>,
) -> ApiResult<Json<SingleResponse<Episode>>> {
    req.validate()?;
    let episode =
        run_blocking(move || state.episodes.update_episode(EpisodeId(id), &req.title)).await?;
    Ok(Json(SingleResponse::new(episode)))
}

async fn delete_episode(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    run_blocking(move || state.episodes.delete_episode(EpisodeId(id))).await?;
    Ok(Json(MessageResponse::new("episode deleted")))
}

// Part handlers

async fn list_parts(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListResponse<Part>>> {
    let page = query.page;
    let per_page = state.per_page;
    let (parts, total) = run_blocking(move || Ok(state.parts.list_parts(page, per_page))).await?;
    Ok(Json(ListResponse::new(parts, page, per_page, total)))
}

async fn create_part(
    State(state): State<ServerState>,
    Json(req): Json<CreatePartRequest>,
) -> ApiResult<(StatusCode, Json<SingleResponse<Part>>)> {
    req.validate()?;
    let part = run_blocking(move || state.parts.create_part(req.into_new_part())).await?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(part))))
}

async fn get_part(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SingleResponse<Part>>> {
    let part = run_blocking(move || state.parts.get_part(PartId(id))).await?;
    Ok(Json(SingleResponse::new(part)))
}

async fn update_part(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePartRequest>,
) -> ApiResult<Json<SingleResponse<Part>>> {
    req.validate()?;
    let part = run_blocking(move || state.parts.update_part(PartId(id), req.into_update())).await?;
    Ok(Json(SingleResponse::new(part)))
}

async fn sort_part(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<SortPartRequest>,
) -> ApiResult<Json<SingleResponse<Part>>> {
    let part = run_blocking(move || state.parts.sort_part(PartId(id), req.position)).await?;
    Ok(Json(SingleResponse::new(part)))
}

async fn delete_part(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    run_blocking(move || state.parts.delete_part(PartId(id))).await?;
    Ok(Json(MessageResponse::new("episode part deleted")))
}
