use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// The master account; bypasses the write quota and owns user approval.
    pub admin_user_id: Uuid,
    pub daily_write_quota: i32,
    pub entries_cache_ttl_secs: u64,
    pub preferences_cache_ttl_secs: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let admin_user_id = std::env::var("ADMIN_USER_ID")?.parse::<Uuid>()?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutrilog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutrilog-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        Ok(Self {
            database_url,
            jwt,
            admin_user_id,
            daily_write_quota: env_or("DAILY_WRITE_QUOTA", 50),
            entries_cache_ttl_secs: env_or("ENTRIES_CACHE_TTL_SECS", 60),
            preferences_cache_ttl_secs: env_or("PREFERENCES_CACHE_TTL_SECS", 300),
        })
    }
}
