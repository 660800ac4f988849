use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::membership::CreateRoomParams;
use crate::models::{
    AccessType, Invitation, Permission, Role, Room, RoomSettings, RoomStatus, SettingsPatch,
};
use crate::state::AppState;

use super::AuthUser;

/// Room routes
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_public).post(create_room))
        .route("/mine", get(my_rooms))
        .route("/{code}", get(get_room).delete(delete_room))
        .route("/{code}/join", post(join_room))
        .route("/{code}/leave", post(leave_room))
        .route("/{code}/token", post(media_token))
        .route("/{code}/recorder-token", post(recorder_token))
        .route("/{code}/settings", patch(update_settings))
        .route("/{code}/participants/{user_id}/role", put(change_role))
        .route(
            "/{code}/participants/{user_id}/permissions",
            put(set_permission),
        )
        .route("/{code}/participants/{user_id}/kick", post(kick))
        .route("/{code}/invitations", post(invite))
        .route("/{code}/invitations/respond", post(respond_invitation))
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_access")]
    access: AccessType,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_max_participants")]
    max_participants: u32,
    #[serde(default)]
    settings: Option<RoomSettings>,
}

fn default_access() -> AccessType {
    AccessType::Public
}

fn default_max_participants() -> u32 {
    10
}

#[derive(Debug, Serialize)]
struct ParticipantInfo {
    user_id: String,
    role: Role,
    is_active: bool,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

/// Room view returned to clients. Never exposes the password hash.
#[derive(Debug, Serialize)]
struct RoomResponse {
    code: String,
    name: String,
    description: String,
    access: AccessType,
    status: RoomStatus,
    max_participants: u32,
    active_participants: usize,
    participants: Vec<ParticipantInfo>,
    invitations: Vec<Invitation>,
    settings: RoomSettings,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            name: room.name.clone(),
            description: room.description.clone(),
            access: room.access,
            status: room.status(),
            max_participants: room.max_participants,
            active_participants: room.active_participant_count(),
            participants: room
                .participants
                .values()
                .map(|p| ParticipantInfo {
                    user_id: p.user_id.clone(),
                    role: p.role,
                    is_active: p.is_active,
                    joined_at: p.joined_at,
                    left_at: p.left_at,
                })
                .collect(),
            invitations: room.invitations.clone(),
            settings: room.settings.clone(),
            created_at: room.created_at,
            last_activity_at: room.last_activity_at,
        }
    }
}

/// POST /api/v1/rooms - Create a new room
async fn create_room(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>> {
    let params = CreateRoomParams {
        name: request.name,
        description: request.description,
        access: request.access,
        password: request.password,
        max_participants: request.max_participants,
        settings: request.settings.unwrap_or_default(),
    };

    let room = state.rooms.create(&claims.sub, params).await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[derive(Debug, Deserialize)]
struct ListRoomsQuery {
    limit: Option<i64>,
}

/// GET /api/v1/rooms - List public rooms
async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<ListRoomsQuery>,
) -> Result<Json<Vec<RoomResponse>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rooms = state.rooms.list_public(limit).await?;
    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}

/// GET /api/v1/rooms/mine - Rooms the caller has a roster entry in
async fn my_rooms(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<RoomResponse>>> {
    let rooms = state.rooms.rooms_for_user(&claims.sub).await?;
    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}

/// GET /api/v1/rooms/:code
async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomResponse>> {
    let room = state.rooms.get(&code).await?;
    Ok(Json(RoomResponse::from(&room)))
}

/// DELETE /api/v1/rooms/:code - owner only
async fn delete_room(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.rooms.delete(&code, &claims.sub).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize, Default)]
struct JoinRequest {
    #[serde(default)]
    password: Option<String>,
}

/// POST /api/v1/rooms/:code/join
async fn join_room(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<RoomResponse>> {
    let room = state
        .rooms
        .join(&code, &claims.sub, request.password.as_deref())
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

/// POST /api/v1/rooms/:code/leave
async fn leave_room(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.rooms.leave(&code, &claims.sub).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize, Default)]
struct TokenRequest {
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    url: String,
    expires_in: u64,
}

/// POST /api/v1/rooms/:code/token - media-service token for the caller
async fn media_token(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let metadata = request
        .metadata
        .unwrap_or_else(|| serde_json::json!({}));

    let token = state
        .rooms
        .issue_media_token(&code, &claims.sub, &claims.name, metadata)
        .await?;

    Ok(Json(TokenResponse {
        token,
        url: state.config.media_service_url.clone(),
        expires_in: state.config.media_token_ttl_seconds,
    }))
}

/// POST /api/v1/rooms/:code/recorder-token
async fn recorder_token(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<TokenResponse>> {
    let token = state.rooms.issue_recorder_token(&code, &claims.sub).await?;

    Ok(Json(TokenResponse {
        token,
        url: state.config.media_service_url.clone(),
        expires_in: state.config.media_token_ttl_seconds,
    }))
}

/// PATCH /api/v1/rooms/:code/settings - owner/admin only
async fn update_settings(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<RoomResponse>> {
    let room = state.rooms.update_settings(&code, &claims.sub, patch).await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: Role,
}

/// PUT /api/v1/rooms/:code/participants/:user_id/role
async fn change_role(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((code, user_id)): Path<(String, String)>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<RoomResponse>> {
    let room = state
        .rooms
        .change_role(&code, &claims.sub, &user_id, request.role)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[derive(Debug, Deserialize)]
struct PermissionRequest {
    permission: Permission,
    allow: bool,
}

/// PUT /api/v1/rooms/:code/participants/:user_id/permissions
async fn set_permission(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((code, user_id)): Path<(String, String)>,
    Json(request): Json<PermissionRequest>,
) -> Result<Json<RoomResponse>> {
    let room = state
        .rooms
        .set_permission(&code, &claims.sub, &user_id, request.permission, request.allow)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

/// POST /api/v1/rooms/:code/participants/:user_id/kick
async fn kick(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((code, user_id)): Path<(String, String)>,
) -> Result<Json<RoomResponse>> {
    let room = state.rooms.kick(&code, &claims.sub, &user_id).await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[derive(Debug, Deserialize)]
struct InviteRequest {
    user_id: String,
}

/// POST /api/v1/rooms/:code/invitations
async fn invite(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
    Json(request): Json<InviteRequest>,
) -> Result<Json<RoomResponse>> {
    let room = state
        .rooms
        .invite(&code, &claims.sub, &request.user_id)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[derive(Debug, Deserialize)]
struct RespondRequest {
    accept: bool,
}

/// POST /api/v1/rooms/:code/invitations/respond
async fn respond_invitation(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(code): Path<String>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<RoomResponse>> {
    let room = state
        .rooms
        .respond_to_invitation(&code, &claims.sub, request.accept)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}
