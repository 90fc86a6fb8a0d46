use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::VoiceSession;
use crate::state::AppState;
use crate::storage::SessionPatch;

use super::documents::load_owned_document;

#[derive(Deserialize)]
pub struct ListSessionsQuery {
    order: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub transcript: String,
    pub duration: u64,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateSessionRequest {
    pub transcript: Option<String>,
    pub duration: Option<u64>,
    pub notes: Option<String>,
}

/// Newest-first history view by default; `order=asc` gives the logical
/// transcript order.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
    Query(query): Query<ListSessionsQuery>,
) -> AppResult<Json<Vec<VoiceSession>>> {
    load_owned_document(&state, &user, document_id).await?;
    let mut sessions = state.store.get_sessions(document_id).await?;
    match query.order.as_deref() {
        None | Some("desc") => sessions.reverse(),
        Some("asc") => {}
        Some(other) => {
            return Err(AppError::bad_request(format!("unknown order \"{other}\"")));
        }
    }
    Ok(Json(sessions))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<VoiceSession>)> {
    if payload.transcript.trim().is_empty() {
        return Err(AppError::bad_request("transcript must not be empty"));
    }
    load_owned_document(&state, &user, document_id).await?;
    let session = state
        .store
        .add_session(
            document_id,
            payload.transcript,
            payload.duration,
            payload.notes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn update_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionRequest>,
) -> AppResult<Json<VoiceSession>> {
    let (_, doc) = state.store.get_session(id).await?;
    if doc.user_id != user.user_id {
        return Err(AppError::not_found());
    }
    let patch = SessionPatch {
        transcript: payload.transcript,
        duration: payload.duration,
        notes: payload.notes,
    };
    let session = state.store.update_session(id, patch).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let (_, doc) = state.store.get_session(id).await?;
    if doc.user_id != user.user_id {
        return Err(AppError::not_found());
    }
    state.store.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
