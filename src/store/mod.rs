pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::{ensure_indexes, MongoRoomStore, MongoUserStore};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Room, User};

/// Persistent room storage. The store is the source of truth; the cache in
/// front of it is advisory only.
///
/// `update` is the optimistic-concurrency seam: it replaces the stored
/// document only if its `version` still matches the one the caller read, and
/// fails with `StoreConflict` otherwise. Callers retry the whole
/// read-mutate-update cycle on conflict.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>>;

    /// Rooms in which `user_id` has a roster entry (active or not).
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Room>>;

    async fn find_public(&self, limit: i64) -> Result<Vec<Room>>;

    /// Insert a new room. Fails with `StoreConflict` if the code is taken.
    async fn insert(&self, room: &Room) -> Result<()>;

    /// Versioned replace. Returns the stored document with its bumped
    /// version on success, `StoreConflict` if another writer got there first.
    async fn update(&self, room: &Room) -> Result<Room>;

    /// Hard delete. Returns whether a document was removed.
    async fn delete(&self, code: &str) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user and return it with its assigned id. Fails with
    /// `StoreConflict` on a duplicate email.
    async fn insert(&self, user: &User) -> Result<User>;

    async fn update(&self, user: &User) -> Result<()>;
}
