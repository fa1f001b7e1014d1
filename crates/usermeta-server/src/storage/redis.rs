//! Redis coordination store
//!
//! Lock records are written with a single `SET key value NX PX ttl`, so two
//! server instances racing on the same key can never both succeed.

use crate::config::RedisConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use usermeta_core::store::with_timeout;
use usermeta_core::{wait_until_ready, BootstrapError, CoordinationStore, StoreError, StoreResult};

pub struct RedisStore {
    conn: RwLock<Option<ConnectionManager>>,
    address: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl RedisStore {
    /// Connect and ping until Redis answers or the retry budget runs out.
    pub async fn connect(config: &RedisConfig) -> Result<Self, BootstrapError> {
        let url = config.url();
        let dial_timeout = config.dial_timeout();
        let read_timeout = config.read_timeout();

        let conn = wait_until_ready("redis", &config.address, config.retry_policy(), |_| {
            let url = url.clone();
            async move {
                let client = redis::Client::open(url.as_str()).map_err(redis_error)?;
                let mut conn = with_timeout(dial_timeout, async {
                    ConnectionManager::new(client).await.map_err(redis_error)
                })
                .await?;
                with_timeout(read_timeout, ping(&mut conn)).await?;
                Ok(conn)
            }
        })
        .await?;

        Ok(Self {
            conn: RwLock::new(Some(conn)),
            address: config.address.clone(),
            read_timeout,
            write_timeout: config.write_timeout(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The manager multiplexes one connection, so clones are cheap handles to it
    async fn connection(&self) -> StoreResult<ConnectionManager> {
        self.conn.read().await.clone().ok_or(StoreError::Closed)
    }
}

async fn ping(conn: &mut ConnectionManager) -> StoreResult<()> {
    redis::cmd("PING")
        .query_async::<_, String>(conn)
        .await
        .map(|_| ())
        .map_err(redis_error)
}

fn redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

/// `PX` takes whole milliseconds and rejects zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.connection().await?;

        let reply = with_timeout(self.write_timeout, async {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<_, Option<String>>(&mut conn)
                .await
                .map_err(redis_error)
        })
        .await?;

        // Nil reply means the key already existed
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;

        with_timeout(self.write_timeout, async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, i64>(&mut conn)
                .await
                .map_err(redis_error)
        })
        .await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        with_timeout(self.read_timeout, ping(&mut conn)).await
    }

    async fn close(&self) -> StoreResult<()> {
        match self.conn.write().await.take() {
            Some(_) => {
                info!("Closed redis connection: {}", self.address);
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }

    #[test]
    fn test_error_classification() {
        let io = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(redis_error(io), StoreError::Connection(_)));

        let reply = RedisError::from((redis::ErrorKind::ResponseError, "WRONGTYPE"));
        assert!(matches!(redis_error(reply), StoreError::Backend(_)));
    }
}
