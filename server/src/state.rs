use std::sync::Arc;

use base64::Engine as _;
use color_eyre::eyre::{eyre, WrapErr as _};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_cookies::Key;
use tracing::warn;

use crate::accounts::AccountManager;
use crate::config::Config;
use crate::posts::ContentStore;
use crate::store::{MemoryStore, PgStore, Store};
use crate::uploads::UploadStore;

/// Everything a request handler needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cookie_key: Key,
    pub accounts: AccountManager,
    pub posts: ContentStore,
    pub uploads: UploadStore,
}

impl AppState {
    pub async fn from_env() -> crate::Result<Self> {
        let config = Config::from_env()?;

        let store: Arc<dyn Store> = match &config.database_url {
            Some(database_url) => Arc::new(PgStore::new(setup_db_pool(database_url).await?)),
            None => {
                warn!("DATABASE_URL not set, keeping accounts and posts in memory");
                Arc::new(MemoryStore::default())
            }
        };

        let cookie_key = cookie_key_from_env()?;

        Ok(Self::new(config, store, cookie_key))
    }

    pub fn new(config: Config, store: Arc<dyn Store>, cookie_key: Key) -> Self {
        let uploads = UploadStore::new(&config.upload_dir);

        Self {
            accounts: AccountManager::new(
                store.clone(),
                uploads.clone(),
                config.session_duration_days,
            ),
            posts: ContentStore::new(store, config.super_user_id),
            uploads,
            cookie_key,
            config,
        }
    }

    pub fn version(&self) -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }
}

/// Reads the base64 encoded `COOKIE_KEY`, or generates a throwaway key
pub fn cookie_key_from_env() -> crate::Result<Key> {
    let Ok(encoded) = std::env::var("COOKIE_KEY") else {
        warn!("COOKIE_KEY not set, generating a key. Sessions won't survive a restart");
        return Ok(Key::generate());
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .wrap_err("Failed to decode base64-encoded COOKIE_KEY")?;

    Key::try_from(bytes.as_slice())
        .map_err(|e| eyre!("COOKIE_KEY must be at least 64 bytes: {}", e))
}

#[tracing::instrument(err, skip(database_url))]
pub async fn setup_db_pool(database_url: &str) -> crate::Result<PgPool> {
    const MIGRATION_LOCK_ID: i64 = 0xDB_DB_DB_DB_DB_DB_DB;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    if unlocked {
        tracing::info!("Migration lock unlocked");
    } else {
        tracing::info!("Failed to unlock migration lock");
    }

    Ok(pool)
}
