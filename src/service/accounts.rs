//! Account lifecycle: registration, login with lockout, profile lookup.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::AuthService;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::security;
use crate::store::UserStore;

const MIN_PASSWORD_LEN: usize = 8;

pub struct AccountService {
    users: Arc<dyn UserStore>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, auth: Arc<AuthService>) -> Self {
        Self { users, auth }
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::BadRequest("invalid email address".to_string()));
        }
        let username = username.trim();
        if !(3..=32).contains(&username.chars().count()) {
            return Err(AppError::BadRequest(
                "username must be 3-32 characters".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let display_name = if display_name.trim().is_empty() {
            username.to_string()
        } else {
            display_name.trim().to_string()
        };

        let password_hash = security::hash_password(password)?;
        let user = User::new(
            email,
            username.to_string(),
            display_name,
            password_hash,
            Utc::now(),
        );

        match self.users.insert(&user).await {
            Ok(stored) => {
                tracing::info!(user_id = %stored.id_string(), "User registered");
                Ok(stored)
            }
            Err(AppError::StoreConflict) => Err(AppError::BadRequest(
                "email is already registered".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Verify credentials and issue an identity token. Failed attempts are
    /// counted; the account locks after repeated failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("account is disabled".to_string()));
        }
        if user.is_locked(now) {
            return Err(AppError::Unauthorized(
                "account is temporarily locked".to_string(),
            ));
        }

        if !security::verify_password(&user.password_hash, password) {
            user.register_login_failure(now);
            self.users.update(&user).await?;
            return Err(AppError::Unauthorized("invalid credentials".to_string()));
        }

        if user.failed_login_attempts > 0 {
            user.clear_login_failures();
            self.users.update(&user).await?;
        }

        let token = self.auth.generate_token(&user)?;
        tracing::info!(user_id = %user.id_string(), "User logged in");
        Ok((user, token))
    }

    pub async fn profile(&self, user_id: &str) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::user::MAX_FAILED_LOGINS;
    use crate::store::MemoryStore;

    fn test_service() -> AccountService {
        let config = Config {
            server_host: "localhost".to_string(),
            server_port: 8080,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "meetpoint_test".to_string(),
            redis_url: "redis://localhost".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_seconds: 900,
            media_service_url: "wss://media.example.com".to_string(),
            media_api_key: "api-key".to_string(),
            media_api_secret: "api-secret".to_string(),
            media_token_ttl_seconds: 3600,
            room_cache_ttl_seconds: 300,
        };
        AccountService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AuthService::new(&config)),
        )
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = test_service();
        let user = svc
            .register("Alice@Example.com", "alice", "Alice", "correct horse")
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");

        let (logged_in, token) = svc.login("alice@example.com", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let svc = test_service();
        svc.register("a@b.com", "alice", "", "longenough")
            .await
            .unwrap();
        let err = svc
            .register("a@b.com", "alice2", "", "longenough")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let svc = test_service();
        svc.register("a@b.com", "alice", "", "correct horse")
            .await
            .unwrap();

        for _ in 0..MAX_FAILED_LOGINS {
            let err = svc.login("a@b.com", "wrong").await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }

        // Correct password no longer helps while locked.
        let err = svc.login("a@b.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn weak_registrations_rejected() {
        let svc = test_service();
        assert!(svc.register("not-an-email", "alice", "", "longenough").await.is_err());
        assert!(svc.register("a@b.com", "al", "", "longenough").await.is_err());
        assert!(svc.register("a@b.com", "alice", "", "short").await.is_err());
    }
}
