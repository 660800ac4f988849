//! Capability tokens for the hosted media service.
//!
//! The service admits a client into a real-time session on presentation of a
//! signed JWT whose `video` claim scopes what the holder may do. This module
//! is stateless: a token is a pure function of (identity, room code, grant,
//! shared secret) plus the wall clock for expiry.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::models::Role;

/// Media-service capability grant, serialized into the token's `video`
/// claim. Field names follow the service's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub room_admin: bool,
    pub room_create: bool,
}

impl VideoGrant {
    /// Interactive participant: publish + subscribe, no admin surface.
    pub fn participant(room_code: &str) -> Self {
        Self {
            room_join: true,
            room: room_code.to_string(),
            can_publish: true,
            can_subscribe: true,
            room_admin: false,
            room_create: false,
        }
    }

    /// Recorder: subscribe-only, but room-admin so it can observe every
    /// track without publishing anything itself.
    pub fn recorder(room_code: &str) -> Self {
        Self {
            room_join: true,
            room: room_code.to_string(),
            can_publish: false,
            can_subscribe: true,
            room_admin: true,
            room_create: false,
        }
    }

    /// Room administrator: full publish/subscribe plus room management.
    pub fn admin(room_code: &str) -> Self {
        Self {
            room_join: true,
            room: room_code.to_string(),
            can_publish: true,
            can_subscribe: true,
            room_admin: true,
            room_create: true,
        }
    }
}

/// Claims layout expected by the media service's token verifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaClaims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    pub name: String,
    pub video: VideoGrant,
    pub metadata: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    encoding_key: EncodingKey,
    service_url: String,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.media_api_key.clone(),
            encoding_key: EncodingKey::from_secret(config.media_api_secret.as_bytes()),
            service_url: config.media_service_url.clone(),
            ttl_seconds: config.media_token_ttl_seconds,
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Map a resolved room role onto a grant shape. Moderators keep the
    /// participant grant; room management stays with owner/admin.
    pub fn grant_for_role(role: Role, room_code: &str) -> VideoGrant {
        match role {
            Role::Owner | Role::Admin => VideoGrant::admin(room_code),
            Role::Moderator | Role::Participant => VideoGrant::participant(room_code),
        }
    }

    /// Sign a capability token. `metadata` is an arbitrary caller-supplied
    /// blob carried opaquely to other session participants.
    pub fn issue(
        &self,
        identity: &str,
        display_name: &str,
        grant: VideoGrant,
        metadata: serde_json::Value,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = MediaClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + self.ttl_seconds as i64,
            name: display_name.to_string(),
            video: grant,
            metadata: metadata.to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn issuer() -> TokenIssuer {
        let config = Config {
            server_host: "localhost".to_string(),
            server_port: 8080,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "meetpoint_test".to_string(),
            redis_url: "redis://localhost".to_string(),
            jwt_secret: "identity-secret".to_string(),
            jwt_expiry_seconds: 900,
            media_service_url: "wss://media.example.com".to_string(),
            media_api_key: "api-key".to_string(),
            media_api_secret: "api-secret".to_string(),
            media_token_ttl_seconds: 3600,
            room_cache_ttl_seconds: 300,
        };
        TokenIssuer::new(&config)
    }

    fn decode_claims(token: &str) -> MediaClaims {
        let mut validation = Validation::default();
        validation.validate_nbf = true;
        decode::<MediaClaims>(
            token,
            &DecodingKey::from_secret(b"api-secret"),
            &validation,
        )
        .expect("token should verify against the shared secret")
        .claims
    }

    #[test]
    fn participant_token_carries_grant_and_metadata() {
        let token = issuer()
            .issue(
                "user-1",
                "Alice",
                VideoGrant::participant("ROOMCODE"),
                json!({ "role": "participant", "avatar": "a.png" }),
            )
            .unwrap();

        let claims = decode_claims(&token);
        assert_eq!(claims.iss, "api-key");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.video, VideoGrant::participant("ROOMCODE"));

        let metadata: serde_json::Value = serde_json::from_str(&claims.metadata).unwrap();
        assert_eq!(metadata["role"], "participant");
    }

    #[test]
    fn grant_shapes() {
        let p = VideoGrant::participant("R");
        assert!(p.can_publish && p.can_subscribe && !p.room_admin && !p.room_create);

        let r = VideoGrant::recorder("R");
        assert!(!r.can_publish && r.can_subscribe && r.room_admin && !r.room_create);

        let a = VideoGrant::admin("R");
        assert!(a.can_publish && a.can_subscribe && a.room_admin && a.room_create);
    }

    #[test]
    fn role_to_grant_mapping() {
        assert_eq!(
            TokenIssuer::grant_for_role(Role::Owner, "R"),
            VideoGrant::admin("R")
        );
        assert_eq!(
            TokenIssuer::grant_for_role(Role::Admin, "R"),
            VideoGrant::admin("R")
        );
        assert_eq!(
            TokenIssuer::grant_for_role(Role::Moderator, "R"),
            VideoGrant::participant("R")
        );
        assert_eq!(
            TokenIssuer::grant_for_role(Role::Participant, "R"),
            VideoGrant::participant("R")
        );
    }
}
