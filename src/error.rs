use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid room configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Could not allocate a unique room code")]
    IdSpaceExhausted,

    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room is inactive")]
    RoomInactive,

    #[error("Room is full")]
    RoomFull,

    #[error("Room password is required")]
    PasswordRequired,

    #[error("Invalid room password")]
    InvalidPassword,

    #[error("Not an active participant of this room")]
    NotParticipant,

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Concurrent modification of the room document")]
    StoreConflict,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Password hashing error: {0}")]
    HashError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidConfiguration(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::IdSpaceExhausted => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::RoomNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::RoomInactive => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::RoomFull => (StatusCode::CONFLICT, self.to_string()),
            AppError::PasswordRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidPassword => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotParticipant => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::InsufficientPermission => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::StoreConflict => (StatusCode::CONFLICT, self.to_string()),
            AppError::StoreError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::CacheError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::JwtError(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::HashError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::StoreError(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for AppError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        AppError::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::JwtError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
