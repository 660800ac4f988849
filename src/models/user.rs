use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lockout policy: after this many consecutive failed logins the account is
/// locked for `LOCKOUT_MINUTES`.
pub const MAX_FAILED_LOGINS: u32 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;

/// User account document. `password_hash` is serialized for the store but
/// never exposed through the API (responses use [`UserProfile`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_active: bool,
    #[serde(default)]
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn new(
        email: String,
        username: String,
        display_name: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            email,
            username,
            display_name,
            password_hash,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Count a failed login; lock the account once the threshold is reached.
    pub fn register_login_failure(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts += 1;
        if self.failed_login_attempts >= MAX_FAILED_LOGINS {
            self.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
        }
    }

    pub fn clear_login_failures(&mut self) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
    }

    /// Stable string id for roster keys and JWT subjects.
    pub fn id_string(&self) -> String {
        self.id.map(|oid| oid.to_hex()).unwrap_or_default()
    }
}

/// Identity JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new(
            "alice@example.com".into(),
            "alice".into(),
            "Alice".into(),
            "hash".into(),
            Utc::now(),
        )
    }

    #[test]
    fn locks_after_max_failures() {
        let now = Utc::now();
        let mut user = test_user();

        for _ in 0..MAX_FAILED_LOGINS - 1 {
            user.register_login_failure(now);
            assert!(!user.is_locked(now));
        }

        user.register_login_failure(now);
        assert!(user.is_locked(now));
        assert!(user.is_locked(now + Duration::minutes(LOCKOUT_MINUTES - 1)));
        assert!(!user.is_locked(now + Duration::minutes(LOCKOUT_MINUTES + 1)));
    }

    #[test]
    fn successful_login_resets_counter() {
        let now = Utc::now();
        let mut user = test_user();

        user.register_login_failure(now);
        user.register_login_failure(now);
        user.clear_login_failures();

        assert_eq!(user.failed_login_attempts, 0);
        assert!(!user.is_locked(now));
    }
}
