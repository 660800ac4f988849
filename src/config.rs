use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub mongo_url: String,
    pub mongo_db: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub media_service_url: String,
    pub media_api_key: String,
    pub media_api_secret: String,
    pub media_token_ttl_seconds: u64,
    pub room_cache_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            mongo_url: env::var("MONGO_URL")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: env::var("MONGO_DB").unwrap_or_else(|_| "meetpoint".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            media_service_url: env::var("MEDIA_SERVICE_URL")
                .unwrap_or_else(|_| "wss://localhost:7880".to_string()),
            media_api_key: env::var("MEDIA_API_KEY").map_err(|_| ConfigError::MissingMediaKeys)?,
            media_api_secret: env::var("MEDIA_API_SECRET")
                .map_err(|_| ConfigError::MissingMediaKeys)?,
            media_token_ttl_seconds: env::var("MEDIA_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "21600".to_string())
                .parse()
                .unwrap_or(21600),
            room_cache_ttl_seconds: env::var("ROOM_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("JWT_SECRET environment variable is required")]
    MissingJwtSecret,
    #[error("MEDIA_API_KEY and MEDIA_API_SECRET environment variables are required")]
    MissingMediaKeys,
}
