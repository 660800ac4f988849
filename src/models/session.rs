use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One distinct call occurrence within a room: opened when the first
/// participant joins an empty room, closed when the last one leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<SessionParticipant>,
    #[serde(default)]
    pub recording: RecordingInfo,
}

impl CallSession {
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: now,
            ended_at: None,
            participants: Vec::new(),
            recording: RecordingInfo::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Stamp a join for `user_id`. A rejoin within the same session adds a
    /// fresh presence row so per-session attendance stays accurate.
    pub fn record_join(&mut self, user_id: &str, now: DateTime<Utc>) {
        self.participants.push(SessionParticipant {
            user_id: user_id.to_string(),
            joined_at: now,
            left_at: None,
        });
    }

    /// Stamp the open presence row for `user_id`, if any.
    pub fn record_leave(&mut self, user_id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self
            .participants
            .iter_mut()
            .rev()
            .find(|p| p.user_id == user_id && p.left_at.is_none())
        {
            entry.left_at = Some(now);
        }
    }

    pub fn close(&mut self, now: DateTime<Utc>) {
        self.ended_at = Some(now);
        if self.recording.is_active {
            self.recording.is_active = false;
            self.recording.ended_at = Some(now);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParticipant {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingInfo {
    #[serde(default)]
    pub is_active: bool,
    pub url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}
