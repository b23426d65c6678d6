use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub redis_connect_timeout: u64,
    pub redis_session_prefix: String,
    pub redis_token_prefix: String,
    pub jwt_secret: String,
    /// Access and id token lifetimes in seconds.
    pub access_token_expiry: u64,
    pub refresh_token_expiry: u64,
    pub id_token_expiry: u64,
    /// Passphrase stretched into the vault key. Rotating it
    /// invalidates every previously sealed secret.
    pub encryption_key: String,
    pub sso_callback_url: String,
    pub cors_origin: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .unwrap_or(3001);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/keygate".to_string());

        let redis_url = env::var("REDIS_URL").ok();

        let redis_pool_size = env::var("REDIS_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let redis_connect_timeout = env::var("REDIS_CONNECT_TIMEOUT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let redis_session_prefix =
            env::var("REDIS_SESSION_PREFIX").unwrap_or_else(|_| "sso:session:".to_string());

        let redis_token_prefix =
            env::var("REDIS_TOKEN_PREFIX").unwrap_or_else(|_| "sso:token:".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let access_token_expiry = env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let refresh_token_expiry = env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "2592000".to_string())
            .parse()
            .unwrap_or(2_592_000);

        let id_token_expiry = env::var("JWT_ID_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let encryption_key = env::var("ENCRYPTION_KEY")
            .unwrap_or_else(|_| "your-32-character-encryption-key".to_string());

        let sso_callback_url = env::var("SSO_CALLBACK_URL")
            .unwrap_or_else(|_| "http://localhost:3001/api/v1/auth/callback".to_string());

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());

        Ok(Config {
            port,
            database_url,
            redis_url,
            redis_pool_size,
            redis_connect_timeout,
            redis_session_prefix,
            redis_token_prefix,
            jwt_secret,
            access_token_expiry,
            refresh_token_expiry,
            id_token_expiry,
            encryption_key,
            sso_callback_url,
            cors_origin,
        })
    }
}
