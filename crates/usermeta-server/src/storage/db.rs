//! Postgres database layer

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{info, warn};
use usermeta_core::{
    wait_until_ready, BootstrapError, MetaKey, StoreError, StoreResult, User, UserMeta, UserStore,
};

type UserRow = (i64, String, String, DateTime<Utc>, DateTime<Utc>);
type MetaRow = (i64, String, String, DateTime<Utc>, DateTime<Utc>);

pub struct Database {
    pool: PgPool,
    address: String,
}

impl Database {
    /// Open the pool and probe it until Postgres answers or the retry budget runs out.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, BootstrapError> {
        let address = config.address();

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        // Lazy pool: connections are made by the probe below, not here
        let pool = PgPoolOptions::new()
            .max_connections(config.max_conn)
            .min_connections(config.idle_conn)
            .max_lifetime(config.lifetime())
            .acquire_timeout(config.dial_timeout())
            .connect_lazy_with(options);

        wait_until_ready("postgres", &address, config.retry_policy(), |_| {
            let pool = pool.clone();
            async move { Self::probe(&pool).await }
        })
        .await?;

        Ok(Self { pool, address })
    }

    async fn probe(pool: &PgPool) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(db_error)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed postgres pool: {}", self.address);
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                user_name VARCHAR(64) UNIQUE NOT NULL,
                password TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_meta (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                meta_key VARCHAR(32) NOT NULL,
                meta_value TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (user_id, meta_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    /// Empty both tables and reset their id sequences
    pub async fn truncate(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE TABLE user_meta, users RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::PoolTimedOut => StoreError::Connection("pool timed out".to_string()),
        sqlx::Error::PoolClosed => StoreError::Closed,
        sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
        e => StoreError::Backend(e.to_string()),
    }
}

fn user_from_row((id, user_name, password_hash, created_at, updated_at): UserRow) -> User {
    User {
        id,
        user_name,
        password_hash,
        created_at,
        updated_at,
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, user_name: &str, password_hash: &str) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (user_name, password)
            VALUES ($1, $2)
            RETURNING id, user_name, password, created_at, updated_at
            "#,
        )
        .bind(user_name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(user_from_row(row))
    }

    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, user_name, password, created_at, updated_at
            FROM users WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(user_from_row))
    }

    async fn user_exists(&self, id: i64) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn upsert_meta(&self, user_id: i64, key: MetaKey, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_meta (user_id, meta_key, meta_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, meta_key)
            DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_meta(&self, user_id: i64, key: Option<MetaKey>) -> StoreResult<Vec<UserMeta>> {
        let rows: Vec<MetaRow> = sqlx::query_as(
            r#"
            SELECT user_id, meta_key, meta_value, created_at, updated_at
            FROM user_meta
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR meta_key = $2)
            ORDER BY meta_key
            "#,
        )
        .bind(user_id)
        .bind(key.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let metas = rows
            .into_iter()
            .filter_map(|(user_id, meta_key, value, created_at, updated_at)| {
                match meta_key.parse::<MetaKey>() {
                    Ok(key) => Some(UserMeta {
                        user_id,
                        key,
                        value,
                        created_at,
                        updated_at,
                    }),
                    Err(_) => {
                        warn!(user_id, meta_key = %meta_key, "Skipping unknown meta key");
                        None
                    }
                }
            })
            .collect();

        Ok(metas)
    }
}
