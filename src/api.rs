//! HTTP API endpoints.
//!
//! Room creation, listing and lobby settings for clients that are not (yet)
//! on a socket. Gameplay itself only runs over the WebSocket.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::room::RoomView;
use crate::state::AppState;
use crate::types::*;
use crate::ws::handlers;

/// A `GameError` rendered as an HTTP response with the error envelope as body
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GameError::RoomNotFound(_) | GameError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
            GameError::Precondition(_) => StatusCode::CONFLICT,
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::Exhausted(_) | GameError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_retryable() {
            tracing::warn!("API request failed: {}", self.0);
        }
        (self.status(), Json(ServerMessage::error(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_code(raw: &str) -> ApiResult<RoomCode> {
    Ok(raw.parse::<RoomCode>()?)
}

fn require_user(user_id: &str) -> ApiResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(GameError::Validation("user_id is required".to_string()).into());
    }
    Ok(trimmed)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub settings: Option<SettingsPatch>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub user_id: UserId,
    pub settings: SettingsPatch,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<UserId>,
}

/// A room as seen by one viewer, plus display profiles for its players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetails {
    pub room: RoomView,
    pub profiles: HashMap<UserId, Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub rooms: usize,
    pub connections: usize,
}

/// Create a room.
///
/// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomView>)> {
    let user_id = require_user(&req.user_id)?;
    let room = handlers::create_room(&state, user_id, &req.settings.unwrap_or_default()).await?;
    Ok((StatusCode::CREATED, Json(room.view_for(Some(user_id)))))
}

/// Unfinished rooms the user is playing in.
///
/// GET /api/rooms?user_id=
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<RoomView>>> {
    let user_id = require_user(query.user_id.as_deref().unwrap_or_default())?;
    let rooms = state.registry.rooms_for_user(user_id).await;
    Ok(Json(
        rooms
            .iter()
            .map(|room| room.view_for(Some(user_id)))
            .collect(),
    ))
}

/// One room, redacted for the optional viewer.
///
/// GET /api/rooms/{code}?user_id=
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<RoomDetails>> {
    let code = parse_code(&code)?;
    let room = state.registry.get(&code).await?;
    let profiles = state.directory.resolve_profiles(&room.player_ids()).await;
    Ok(Json(RoomDetails {
        room: room.view_for(query.user_id.as_deref()),
        profiles,
    }))
}

/// Host-only lobby settings change; members on a socket are notified.
///
/// PATCH /api/rooms/{code}/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<RoomView>> {
    let code = parse_code(&code)?;
    let user_id = require_user(&req.user_id)?;
    let room = handlers::update_settings(&state, user_id, &code, &req.settings).await?;
    Ok(Json(room.view_for(Some(user_id))))
}

/// Word categories on offer.
///
/// GET /api/categories
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<BTreeSet<&'static str>> {
    Json(state.words.categories())
}

/// GET /healthz
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        rooms: state.registry.len().await,
        connections: state.connections.len().await,
    })
}
