//! Room orchestration: load the aggregate, run a membership operation, and
//! commit through the store's versioned update.
//!
//! Two concurrent joins against a room with one free slot must not both pass
//! the capacity gate. The store's version precondition rejects the second
//! commit; the losing request reloads the room and re-evaluates the gates,
//! which then (correctly) report the room as full.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::RoomCache;
use crate::error::{AppError, Result};
use crate::media::{TokenIssuer, VideoGrant};
use crate::membership::{self, CreateRoomParams};
use crate::models::{Permission, Role, Room, SettingsPatch};
use crate::security;

/// Bound on room-code draws before giving up with `IdSpaceExhausted`.
const MAX_CODE_ATTEMPTS: usize = 10;
/// Bound on reload-and-retry cycles when a versioned update loses a race.
const MAX_COMMIT_ATTEMPTS: usize = 3;

pub struct RoomService {
    store: Arc<dyn crate::store::RoomStore>,
    cache: Option<Arc<RoomCache>>,
    tokens: Arc<TokenIssuer>,
}

impl RoomService {
    pub fn new(
        store: Arc<dyn crate::store::RoomStore>,
        cache: Option<Arc<RoomCache>>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            cache,
            tokens,
        }
    }

    async fn cache_put(&self, room: &Room) {
        if let Some(cache) = &self.cache {
            cache.put_snapshot(room).await;
        }
    }

    async fn cache_invalidate(&self, code: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(code).await;
        }
    }

    /// Load, apply `op`, commit. On `StoreConflict` the aggregate is
    /// reloaded and the operation re-evaluated from scratch, so gating
    /// decisions are always made against the state that actually commits.
    async fn mutate<T>(
        &self,
        code: &str,
        mut op: impl FnMut(&mut Room) -> Result<T>,
    ) -> Result<(Room, T)> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut room = self
                .store
                .find_by_code(code)
                .await?
                .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;

            let out = op(&mut room)?;

            match self.store.update(&room).await {
                Ok(stored) => {
                    self.cache_put(&stored).await;
                    return Ok((stored, out));
                }
                Err(AppError::StoreConflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::StoreConflict)
    }

    /// Create a room, retrying code draws on collision.
    pub async fn create(&self, owner_id: &str, params: CreateRoomParams) -> Result<Room> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = security::generate_room_code();
            if self.store.find_by_code(&code).await?.is_some() {
                continue;
            }

            let room = membership::create_room(owner_id, code, params.clone(), Utc::now())?;
            match self.store.insert(&room).await {
                Ok(()) => {
                    let stored = self
                        .store
                        .find_by_code(&room.code)
                        .await?
                        .ok_or_else(|| AppError::StoreError("room vanished after insert".into()))?;
                    self.cache_put(&stored).await;
                    tracing::info!(room_code = %stored.code, owner_id = %owner_id, "Room created");
                    return Ok(stored);
                }
                // Another creator raced us to the same code; draw again.
                Err(AppError::StoreConflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::IdSpaceExhausted)
    }

    /// Read path. The cache snapshot is advisory; a miss falls through to
    /// the store.
    pub async fn get(&self, code: &str) -> Result<Room> {
        if let Some(cache) = &self.cache {
            if let Some(room) = cache.get_snapshot(code).await {
                return Ok(room);
            }
        }
        let room = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;
        self.cache_put(&room).await;
        Ok(room)
    }

    pub async fn list_public(&self, limit: i64) -> Result<Vec<Room>> {
        self.store.find_public(limit).await
    }

    pub async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<Room>> {
        self.store.find_by_user(user_id).await
    }

    pub async fn join(&self, code: &str, user_id: &str, password: Option<&str>) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::join(room, user_id, password, Utc::now())
            })
            .await?;
        tracing::info!(room_code = %code, user_id = %user_id, "Participant joined");
        Ok(room)
    }

    pub async fn leave(&self, code: &str, user_id: &str) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::leave(room, user_id, Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(room_code = %code, user_id = %user_id, "Participant left");
        Ok(room)
    }

    pub async fn update_settings(
        &self,
        code: &str,
        caller_id: &str,
        patch: SettingsPatch,
    ) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                if !membership::effective_role(room, caller_id).is_some_and(Role::can_manage) {
                    return Err(AppError::InsufficientPermission);
                }
                membership::update_settings(room, &patch, Utc::now());
                Ok(())
            })
            .await?;
        Ok(room)
    }

    pub async fn change_role(
        &self,
        code: &str,
        caller_id: &str,
        target_id: &str,
        role: Role,
    ) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::change_role(room, caller_id, target_id, role, Utc::now())
            })
            .await?;
        Ok(room)
    }

    pub async fn set_permission(
        &self,
        code: &str,
        caller_id: &str,
        target_id: &str,
        permission: Permission,
        allow: bool,
    ) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::set_permission(room, caller_id, target_id, permission, allow, Utc::now())
            })
            .await?;
        Ok(room)
    }

    pub async fn kick(&self, code: &str, caller_id: &str, target_id: &str) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::kick(room, caller_id, target_id, Utc::now())
            })
            .await?;
        tracing::info!(room_code = %code, user_id = %target_id, "Participant kicked");
        Ok(room)
    }

    pub async fn invite(&self, code: &str, caller_id: &str, target_id: &str) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::invite(room, caller_id, target_id, Utc::now())
            })
            .await?;
        Ok(room)
    }

    pub async fn respond_to_invitation(
        &self,
        code: &str,
        user_id: &str,
        accept: bool,
    ) -> Result<Room> {
        let (room, _) = self
            .mutate(code, |room| {
                membership::respond_to_invitation(room, user_id, accept, Utc::now())
            })
            .await?;
        Ok(room)
    }

    /// Hard delete. Only the room's owner may remove it; ownership is a
    /// property of the roster record, not of current presence.
    pub async fn delete(&self, code: &str, caller_id: &str) -> Result<()> {
        let room = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;

        let is_owner = room
            .participants
            .get(caller_id)
            .is_some_and(|p| p.role == Role::Owner);
        if !is_owner {
            return Err(AppError::InsufficientPermission);
        }

        self.store.delete(code).await?;
        self.cache_invalidate(code).await;
        tracing::info!(room_code = %code, "Room deleted");
        Ok(())
    }

    /// Issue a media-service token for an active participant, with the grant
    /// shape resolved from their effective role.
    pub async fn issue_media_token(
        &self,
        code: &str,
        user_id: &str,
        display_name: &str,
        metadata: serde_json::Value,
    ) -> Result<String> {
        let room = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;

        let role = membership::effective_role(&room, user_id).ok_or(AppError::NotParticipant)?;
        let grant = TokenIssuer::grant_for_role(role, &room.code);

        let mut metadata = metadata;
        if let Some(object) = metadata.as_object_mut() {
            object.insert("role".to_string(), serde_json::json!(role));
        }

        self.tokens.issue(user_id, display_name, grant, metadata)
    }

    /// Issue a subscribe-only recorder token. Requires the record permission
    /// (or ownership) on the calling participant.
    pub async fn issue_recorder_token(&self, code: &str, caller_id: &str) -> Result<String> {
        let room = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;

        if membership::effective_role(&room, caller_id).is_none() {
            return Err(AppError::NotParticipant);
        }
        if !membership::has_permission(&room, caller_id, Permission::Record) {
            return Err(AppError::InsufficientPermission);
        }
        if !room.settings.recording_enabled {
            return Err(AppError::InsufficientPermission);
        }

        let identity = format!("recorder:{}", room.code);
        self.tokens.issue(
            &identity,
            "Recorder",
            VideoGrant::recorder(&room.code),
            serde_json::json!({ "role": "recorder" }),
        )
    }
}
