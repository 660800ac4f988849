//! Best-effort Redis cache: room snapshots and the logout token blacklist.
//!
//! The store is the source of truth; everything here is advisory. Public
//! methods never surface errors — a failed cache read is a miss, a failed
//! write is logged and dropped, and the caller carries on against the store.

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::Result;
use crate::models::Room;
use crate::security;

#[derive(Clone)]
pub struct RoomCache {
    pool: Pool,
    snapshot_ttl_seconds: u64,
}

impl RoomCache {
    pub fn new(pool: Pool, snapshot_ttl_seconds: u64) -> Self {
        Self {
            pool,
            snapshot_ttl_seconds,
        }
    }

    fn snapshot_key(code: &str) -> String {
        format!("room:{}:snapshot", code)
    }

    fn blacklist_key(token: &str) -> String {
        format!("jwt:blacklist:{}", security::token_digest(token))
    }

    // ==================== Room snapshots ====================

    pub async fn get_snapshot(&self, code: &str) -> Option<Room> {
        match self.try_get_snapshot(code).await {
            Ok(room) => room,
            Err(e) => {
                tracing::warn!(room_code = %code, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn try_get_snapshot(&self, code: &str) -> Result<Option<Room>> {
        let mut conn = self.pool.get().await?;
        let json: Option<String> = conn.get(Self::snapshot_key(code)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn put_snapshot(&self, room: &Room) {
        if let Err(e) = self.try_put_snapshot(room).await {
            tracing::warn!(room_code = %room.code, error = %e, "Cache write failed");
        }
    }

    async fn try_put_snapshot(&self, room: &Room) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(room)?;

        redis::cmd("SETEX")
            .arg(Self::snapshot_key(&room.code))
            .arg(self.snapshot_ttl_seconds as i64)
            .arg(&json)
            .query_async::<()>(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn invalidate(&self, code: &str) {
        let result: Result<()> = async {
            let mut conn = self.pool.get().await?;
            conn.del::<_, ()>(Self::snapshot_key(code)).await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(room_code = %code, error = %e, "Cache invalidation failed");
        }
    }

    // ==================== Token blacklist ====================

    /// Blacklist a token until its natural expiry. Best-effort: a failed
    /// write means the token stays usable until it expires on its own.
    pub async fn blacklist_token(&self, token: &str, ttl_seconds: u64) {
        let result: Result<()> = async {
            let mut conn = self.pool.get().await?;
            redis::cmd("SETEX")
                .arg(Self::blacklist_key(token))
                .arg(ttl_seconds.max(1) as i64)
                .arg(1i64)
                .query_async::<()>(&mut *conn)
                .await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Token blacklist write failed");
        }
    }

    /// A cache failure reads as "not blacklisted" — the token is still a
    /// validly signed JWT, and the blacklist is advisory.
    pub async fn is_blacklisted(&self, token: &str) -> bool {
        let result: Result<bool> = async {
            let mut conn = self.pool.get().await?;
            let exists: bool = conn.exists(Self::blacklist_key(token)).await?;
            Ok(exists)
        }
        .await;

        match result {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, "Token blacklist read failed");
                false
            }
        }
    }

    // ==================== Health ====================

    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let pong: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(pong == "PONG")
    }
}
