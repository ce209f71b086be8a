use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::cache::ReadCache;
use crate::config::{AppConfig, JwtConfig};
use crate::goals::OverrideMap;
use crate::store::{MemoryStore, NutritionStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NutritionStore>,
    pub config: Arc<AppConfig>,
    /// Per-(user, date) goal sets for days without entries. Never persisted;
    /// lost on restart.
    pub overrides: Arc<OverrideMap>,
    pub cache: Arc<ReadCache>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self::from_parts(Arc::new(PgStore::new(db)), config))
    }

    pub fn from_parts(store: Arc<dyn NutritionStore>, config: Arc<AppConfig>) -> Self {
        let cache = Arc::new(ReadCache::new(
            Duration::from_secs(config.entries_cache_ttl_secs),
            Duration::from_secs(config.preferences_cache_ttl_secs),
        ));
        Self {
            store,
            config,
            overrides: Arc::new(OverrideMap::default()),
            cache,
        }
    }

    /// In-memory state for tests: no database, nil uuid as the admin.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: String::new(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            admin_user_id: Uuid::nil(),
            daily_write_quota: 50,
            entries_cache_ttl_secs: 60,
            preferences_cache_ttl_secs: 300,
        });
        Self::from_parts(Arc::new(MemoryStore::new()), config)
    }
}
