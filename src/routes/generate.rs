use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{Document, Platform, VoiceSession};
use crate::state::AppState;

use super::documents::load_owned_document;

#[derive(Deserialize)]
pub struct RefineRequest {
    pub platform: String,
    pub instruction: String,
}

#[derive(Serialize)]
pub struct RefineResponse {
    pub refined: String,
}

/// The full transcript is the sessions joined in recording order.
fn combined_transcript(sessions: &[VoiceSession]) -> String {
    sessions
        .iter()
        .map(|s| s.transcript.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Regenerates the whole per-platform bundle from the current transcript and
/// persists it in one shot. Nothing is stored if any platform fails.
pub async fn generate_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Document>> {
    let doc = load_owned_document(&state, &user, id).await?;
    let sessions = state.store.get_sessions(id).await?;
    if sessions.is_empty() {
        return Err(AppError::bad_request(
            "document has no voice sessions to generate from",
        ));
    }

    let transcript = combined_transcript(&sessions);
    let content = state
        .generator
        .generate_all(&transcript, &doc.input_language, &doc.output_language)
        .await?;

    let updated = state.store.store_generated_content(id, content).await?;
    Ok(Json(updated))
}

/// Reworks one platform's output according to a free-form instruction and
/// persists the result into that platform's slot.
pub async fn refine_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefineRequest>,
) -> AppResult<Json<RefineResponse>> {
    let platform = Platform::parse(&payload.platform)
        .ok_or_else(|| AppError::bad_request(format!("unknown platform \"{}\"", payload.platform)))?;
    if payload.instruction.trim().is_empty() {
        return Err(AppError::bad_request("instruction must not be empty"));
    }

    let doc = load_owned_document(&state, &user, id).await?;
    let current = doc
        .generated_content
        .as_ref()
        .map(|content| content.platform_text(platform).to_string())
        .ok_or_else(|| AppError::conflict("document has no generated content yet"))?;

    let sessions = state.store.get_sessions(id).await?;
    let transcript = combined_transcript(&sessions);

    let refined = state
        .generator
        .refine(
            &transcript,
            &doc.input_language,
            &doc.output_language,
            platform,
            payload.instruction.trim(),
            Some(&current),
        )
        .await?;

    state
        .store
        .patch_generated_content(id, platform, refined.clone())
        .await?;
    Ok(Json(RefineResponse { refined }))
}
