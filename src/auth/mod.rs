use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Claims, User};

/// JWT identity service
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry_seconds: config.jwt_expiry_seconds,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Generate an identity token for an authenticated user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp();
        let exp = now + self.expiry_seconds as i64;

        let claims = Claims {
            sub: user.id_string(),
            name: user.display_name.clone(),
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate an identity token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn test_config() -> Config {
        Config {
            server_host: "localhost".to_string(),
            server_port: 8080,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "meetpoint_test".to_string(),
            redis_url: "redis://localhost".to_string(),
            jwt_secret: "test-secret-key".to_string(),
            jwt_expiry_seconds: 900,
            media_service_url: "wss://localhost:7880".to_string(),
            media_api_key: "devkey".to_string(),
            media_api_secret: "devsecret".to_string(),
            media_token_ttl_seconds: 21600,
            room_cache_ttl_seconds: 300,
        }
    }

    fn test_user() -> User {
        let mut user = User::new(
            "alice@example.com".into(),
            "alice".into(),
            "Alice".into(),
            "hash".into(),
            Utc::now(),
        );
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn test_generate_and_validate_token() {
        let auth = AuthService::new(&test_config());
        let user = test_user();

        let token = auth.generate_token(&user).expect("Should generate token");
        let claims = auth.validate_token(&token).expect("Should validate token");

        assert_eq!(claims.sub, user.id_string());
        assert_eq!(claims.name, "Alice");
    }

    #[test]
    fn test_invalid_token() {
        let auth = AuthService::new(&test_config());

        let result = auth.validate_token("invalid-token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let auth = AuthService::new(&test_config());
        let mut other_config = test_config();
        other_config.jwt_secret = "another-secret".to_string();
        let other = AuthService::new(&other_config);

        let token = auth.generate_token(&test_user()).unwrap();
        assert!(other.validate_token(&token).is_err());
    }
}
