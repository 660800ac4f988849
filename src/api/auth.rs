use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::UserProfile;
use crate::state::AppState;

use super::AuthUser;

/// Auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    #[serde(default)]
    display_name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    expires_in: u64,
    user: UserProfile,
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserProfile>> {
    let user = state
        .accounts
        .register(
            &request.email,
            &request.username,
            &request.display_name,
            &request.password,
        )
        .await?;

    Ok(Json(UserProfile::from(&user)))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (user, token) = state.accounts.login(&request.email, &request.password).await?;

    Ok(Json(AuthResponse {
        token,
        expires_in: state.auth.expiry_seconds(),
        user: UserProfile::from(&user),
    }))
}

/// POST /api/v1/auth/logout - blacklist the presented token until it expires
async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<serde_json::Value>> {
    let claims = state.auth.validate_token(bearer.token())?;

    let remaining = (claims.exp - Utc::now().timestamp()).max(1) as u64;
    state.cache.blacklist_token(bearer.token(), remaining).await;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/v1/auth/me
async fn me(State(state): State<AppState>, AuthUser(claims): AuthUser) -> Result<Json<UserProfile>> {
    let user = state.accounts.profile(&claims.sub).await?;
    Ok(Json(UserProfile::from(&user)))
}
