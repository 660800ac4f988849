pub mod auth;
pub mod health;
pub mod rooms;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Router;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::error::AppError;
use crate::models::Claims;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::health_routes())
        .with_state(state)
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_routes())
        .nest("/rooms", rooms::room_routes())
}

/// Authenticated caller, extracted from the bearer token. Rejects revoked
/// (blacklisted) tokens before signature validation.
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized("missing bearer token".to_string()))?;

        if state.cache.is_blacklisted(bearer.token()).await {
            return Err(AppError::Unauthorized("token has been revoked".to_string()));
        }

        let claims = state.auth.validate_token(bearer.token())?;
        Ok(AuthUser(claims))
    }
}
