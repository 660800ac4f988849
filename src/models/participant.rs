use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Participant role within a room. `Owner` is assigned exactly once, at room
/// creation, and survives leave/rejoin cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Moderator,
    Participant,
}

impl Role {
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Named permission flags. Independent of role, except that the owner is
/// implicitly granted everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Mute,
    Unmute,
    ShareScreen,
    Chat,
    Record,
    Kick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_mute: bool,
    pub can_unmute: bool,
    pub can_share_screen: bool,
    pub can_chat: bool,
    pub can_record: bool,
    pub can_kick: bool,
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            can_mute: false,
            can_unmute: false,
            can_share_screen: true,
            can_chat: true,
            can_record: false,
            can_kick: false,
        }
    }
}

impl PermissionSet {
    pub fn get(&self, permission: Permission) -> bool {
        match permission {
            Permission::Mute => self.can_mute,
            Permission::Unmute => self.can_unmute,
            Permission::ShareScreen => self.can_share_screen,
            Permission::Chat => self.can_chat,
            Permission::Record => self.can_record,
            Permission::Kick => self.can_kick,
        }
    }

    pub fn set(&mut self, permission: Permission, allow: bool) {
        match permission {
            Permission::Mute => self.can_mute = allow,
            Permission::Unmute => self.can_unmute = allow,
            Permission::ShareScreen => self.can_share_screen = allow,
            Permission::Chat => self.can_chat = allow,
            Permission::Record => self.can_record = allow,
            Permission::Kick => self.can_kick = allow,
        }
    }
}

/// One roster entry. Leaving flips `is_active`/`left_at`; the record itself
/// is never removed, so role and stats survive rejoin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub role: Role,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub permissions: PermissionSet,
    #[serde(default)]
    pub total_time_secs: i64,
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            is_active: true,
            joined_at: now,
            left_at: None,
            permissions: PermissionSet::default(),
            total_time_secs: 0,
            last_seen: now,
        }
    }
}
