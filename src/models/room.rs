use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::invitation::Invitation;
use super::participant::Participant;
use super::session::CallSession;

/// How a room admits participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    Public,
    Private,
    PasswordProtected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityDefault {
    Low,
    Standard,
    High,
    Auto,
}

/// Per-room feature switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub chat_enabled: bool,
    pub screen_share_enabled: bool,
    pub recording_enabled: bool,
    pub quality: QualityDefault,
    pub join_approval: bool,
    pub mute_on_entry: bool,
    pub camera_off_on_entry: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            video_enabled: true,
            audio_enabled: true,
            chat_enabled: true,
            screen_share_enabled: true,
            recording_enabled: false,
            quality: QualityDefault::Auto,
            join_approval: false,
            mute_on_entry: false,
            camera_off_on_entry: false,
        }
    }
}

/// Partial settings update. Shallow merge: `None` fields keep their prior
/// values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub video_enabled: Option<bool>,
    pub audio_enabled: Option<bool>,
    pub chat_enabled: Option<bool>,
    pub screen_share_enabled: Option<bool>,
    pub recording_enabled: Option<bool>,
    pub quality: Option<QualityDefault>,
    pub join_approval: Option<bool>,
    pub mute_on_entry: Option<bool>,
    pub camera_off_on_entry: Option<bool>,
}

impl RoomSettings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.video_enabled {
            self.video_enabled = v;
        }
        if let Some(v) = patch.audio_enabled {
            self.audio_enabled = v;
        }
        if let Some(v) = patch.chat_enabled {
            self.chat_enabled = v;
        }
        if let Some(v) = patch.screen_share_enabled {
            self.screen_share_enabled = v;
        }
        if let Some(v) = patch.recording_enabled {
            self.recording_enabled = v;
        }
        if let Some(v) = patch.quality {
            self.quality = v;
        }
        if let Some(v) = patch.join_approval {
            self.join_approval = v;
        }
        if let Some(v) = patch.mute_on_entry {
            self.mute_on_entry = v;
        }
        if let Some(v) = patch.camera_off_on_entry {
            self.camera_off_on_entry = v;
        }
    }
}

/// Derived room status, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Inactive,
    Empty,
}

/// The room aggregate: identity, access gating, the participant roster,
/// invitations and call sessions. Persisted as a single document; `version`
/// is the optimistic-concurrency token bumped on every committed update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub access: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub max_participants: u32,
    pub is_active: bool,
    #[serde(default)]
    pub settings: RoomSettings,
    /// Roster keyed by user id; iteration preserves join order.
    #[serde(default)]
    pub participants: IndexMap<String, Participant>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    #[serde(default)]
    pub sessions: Vec<CallSession>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Room {
    pub const COLLECTION: &'static str = "rooms";

    pub fn active_participant_count(&self) -> usize {
        self.participants.values().filter(|p| p.is_active).count()
    }

    pub fn status(&self) -> RoomStatus {
        if !self.is_active {
            RoomStatus::Inactive
        } else if self.active_participant_count() > 0 {
            RoomStatus::Active
        } else {
            RoomStatus::Empty
        }
    }

    /// The session currently in progress, if any.
    pub fn open_session_mut(&mut self) -> Option<&mut CallSession> {
        self.sessions.iter_mut().rev().find(|s| s.is_open())
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }
}
