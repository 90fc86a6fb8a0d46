use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Demo-grade bearer auth: the configured demo token maps to the demo user,
/// and any token that parses as a UUID is taken as that user's id. There are
/// no credentials to verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let token = bearer.token();
        if token == state.config.demo_token {
            return Ok(AuthenticatedUser {
                user_id: state.config.demo_user_id,
            });
        }
        token
            .parse::<Uuid>()
            .map(|user_id| AuthenticatedUser { user_id })
            .map_err(|_| AppError::unauthorized())
    }
}
