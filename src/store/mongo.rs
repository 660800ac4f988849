//! MongoDB-backed stores. One document per room aggregate; roster gating and
//! mutation commit atomically through `find_one_and_replace` guarded by the
//! document's `version` field.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::error::{AppError, Result};
use crate::models::{Room, User};

use super::{RoomStore, UserStore};

/// Create the unique indexes the stores rely on. Called once at startup.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let rooms: Collection<Room> = db.collection(Room::COLLECTION);
    rooms
        .create_index(
            IndexModel::builder()
                .keys(doc! { "code": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    let users: Collection<User> = db.collection(User::COLLECTION);
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

#[derive(Clone)]
pub struct MongoRoomStore {
    rooms: Collection<Room>,
}

impl MongoRoomStore {
    pub fn new(db: &Database) -> Self {
        Self {
            rooms: db.collection(Room::COLLECTION),
        }
    }
}

#[async_trait]
impl RoomStore for MongoRoomStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        Ok(self.rooms.find_one(doc! { "code": code }).await?)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Room>> {
        // The roster is a map keyed by user id, so membership is a key probe.
        let filter = doc! { format!("participants.{}", user_id): { "$exists": true } };
        let cursor = self.rooms.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_public(&self, limit: i64) -> Result<Vec<Room>> {
        let filter = doc! { "access": "public", "is_active": true };
        let cursor = self.rooms.find(filter).limit(limit).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, room: &Room) -> Result<()> {
        match self.rooms.insert_one(room).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(AppError::StoreConflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, room: &Room) -> Result<Room> {
        let filter = doc! { "code": &room.code, "version": room.version as i64 };
        let mut next = room.clone();
        next.version += 1;

        match self.rooms.find_one_and_replace(filter, &next).await? {
            Some(_) => Ok(next),
            None => Err(AppError::StoreConflict),
        }
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        let result = self.rooms.delete_one(doc! { "code": code }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(User::COLLECTION),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        Ok(self.users.find_one(doc! { "_id": oid }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn insert(&self, user: &User) -> Result<User> {
        match self.users.insert_one(user).await {
            Ok(result) => {
                let mut stored = user.clone();
                stored.id = result.inserted_id.as_object_id();
                Ok(stored)
            }
            Err(err) if is_duplicate_key(&err) => Err(AppError::StoreConflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, user: &User) -> Result<()> {
        let Some(id) = user.id else {
            return Err(AppError::StoreError("user has no id".to_string()));
        };
        self.users.replace_one(doc! { "_id": id }, user).await?;
        Ok(())
    }
}
