//! `database migrate` and `database seed`

use crate::config::AppConfig;
use crate::services::auth::hash_password;
use crate::storage::Database;
use anyhow::{anyhow, Context, Result};
use tracing::info;
use usermeta_core::{MetaKey, UserStore};

const SEED_AGE: &str = "22";

pub async fn migrate(config: &AppConfig) -> Result<()> {
    let db = connect(config).await?;

    let result = db
        .run_migrations()
        .await
        .context("Failed to run migrations");
    db.close().await;
    result?;

    info!("Migrations applied");
    Ok(())
}

/// Replace every row with `count` users named `user001`, `user002`, ...
pub async fn seed(config: &AppConfig, count: u32) -> Result<()> {
    let db = connect(config).await?;

    let result = seed_users(&db, count).await;
    db.close().await;
    result?;

    info!("Seeded {} users", count);
    Ok(())
}

async fn seed_users(db: &Database, count: u32) -> Result<()> {
    db.truncate().await.context("Failed to truncate tables")?;

    for n in 1..=count {
        let user_name = seed_user_name(n);
        let password_hash =
            hash_password(&seed_password(n)).map_err(|e| anyhow!("{:?}", e))?;

        let user = db
            .create_user(&user_name, &password_hash)
            .await
            .with_context(|| format!("Failed to create {}", user_name))?;
        db.upsert_meta(user.id, MetaKey::Age, SEED_AGE)
            .await
            .with_context(|| format!("Failed to set age of {}", user_name))?;
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> Result<Database> {
    Database::connect(&config.database)
        .await
        .context("Failed to initialize database")
}

fn seed_user_name(n: u32) -> String {
    format!("user{:03}", n)
}

fn seed_password(n: u32) -> String {
    format!("password{:03}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_names() {
        assert_eq!(seed_user_name(1), "user001");
        assert_eq!(seed_password(12), "password012");
        assert_eq!(seed_user_name(1000), "user1000");
    }
}
