//! In-memory store used by tests and local development. Implements the same
//! version-precondition discipline as the Mongo store so concurrency
//! behavior can be exercised without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::error::{AppError, Result};
use crate::models::{AccessType, Room, User};

use super::{RoomStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<String, Room>>,
    users: Mutex<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms.get(code).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Room>> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms
            .values()
            .filter(|r| r.participants.contains_key(user_id))
            .cloned()
            .collect())
    }

    async fn find_public(&self, limit: i64) -> Result<Vec<Room>> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms
            .values()
            .filter(|r| r.access == AccessType::Public && r.is_active)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, room: &Room) -> Result<()> {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(&room.code) {
            return Err(AppError::StoreConflict);
        }
        let mut stored = room.clone();
        if stored.id.is_none() {
            stored.id = Some(ObjectId::new());
        }
        rooms.insert(stored.code.clone(), stored);
        Ok(())
    }

    async fn update(&self, room: &Room) -> Result<Room> {
        let mut rooms = self.rooms.lock().unwrap();
        let current = rooms
            .get(&room.code)
            .ok_or_else(|| AppError::RoomNotFound(room.code.clone()))?;
        if current.version != room.version {
            return Err(AppError::StoreConflict);
        }
        let mut next = room.clone();
        next.version += 1;
        rooms.insert(next.code.clone(), next.clone());
        Ok(next)
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        let mut rooms = self.rooms.lock().unwrap();
        Ok(rooms.remove(code).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::StoreConflict);
        }
        let mut stored = user.clone();
        stored.id = Some(ObjectId::new());
        users.insert(stored.id_string(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        users.insert(user.id_string(), user.clone());
        Ok(())
    }
}
