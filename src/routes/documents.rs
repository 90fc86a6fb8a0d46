use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentStatus, Platform};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListDocumentsQuery {
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    pub input_language: String,
    pub output_language: String,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdateContentRequest {
    pub platform: String,
    pub content: String,
}

/// Loads a document and hides its existence from anyone but the owner.
pub async fn load_owned_document(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> AppResult<Document> {
    let doc = state.store.get_document(id).await?;
    if doc.user_id != user.user_id {
        return Err(AppError::not_found());
    }
    Ok(doc)
}

pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListDocumentsQuery>,
) -> AppResult<Json<Vec<Document>>> {
    let status = match query.status.as_deref() {
        None => DocumentStatus::Draft,
        Some(raw) => DocumentStatus::parse(raw)
            .ok_or_else(|| AppError::bad_request(format!("unknown status \"{raw}\"")))?,
    };
    let docs = state.store.list_documents(user.user_id, status).await?;
    Ok(Json(docs))
}

pub async fn create_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<Document>)> {
    let doc = state
        .store
        .create_document(
            user.user_id,
            &payload.title,
            &payload.input_language,
            &payload.output_language,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn get_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Document>> {
    let doc = load_owned_document(&state, &user, id).await?;
    Ok(Json(doc))
}

pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    load_owned_document(&state, &user, id).await?;
    state.store.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<Document>> {
    let status = DocumentStatus::parse(&payload.status)
        .ok_or_else(|| AppError::bad_request(format!("unknown status \"{}\"", payload.status)))?;
    load_owned_document(&state, &user, id).await?;
    let doc = state.store.set_status(id, status).await?;
    Ok(Json(doc))
}

/// Manual edit of one platform's generated text. Does not touch the
/// staleness flags; an edited copy of stale content is still stale.
pub async fn update_content(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContentRequest>,
) -> AppResult<Json<Document>> {
    let platform = Platform::parse(&payload.platform)
        .ok_or_else(|| AppError::bad_request(format!("unknown platform \"{}\"", payload.platform)))?;
    load_owned_document(&state, &user, id).await?;
    let doc = state
        .store
        .patch_generated_content(id, platform, payload.content)
        .await?;
    Ok(Json(doc))
}
