//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file
//! or directory of files, then `USERMETA__*` environment variables, then CLI
//! overrides. Loaded once at startup and passed down explicitly.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use usermeta_core::RetryPolicy;

pub const ENV_PREFIX: &str = "USERMETA";

const DEFAULT_SECRET: &str = "secret";

/// One year
pub const MAX_TOKEN_EXPIRES_IN_SECS: u64 = 365 * 24 * 60 * 60;

/// One day
pub const MAX_LOCK_TTL_SECS: u64 = 24 * 60 * 60;

const BUILTIN_CONFIG: &str = r#"
address: '0.0.0.0:8080'
database:
  host: localhost
  port: 5432
  name: server
  user: server
  password: server
  max_conn: 10
  idle_conn: 5
  lifetime_secs: 10
  dial_retry: 12
  dial_interval_ms: 5000
  dial_timeout_ms: 5000
redis:
  address: 'localhost:6379'
  password: ''
  db: 0
  dial_retry: 12
  dial_interval_ms: 5000
  dial_timeout_ms: 5000
  read_timeout_ms: 3000
  write_timeout_ms: 3000
token:
  secret: secret
  expires_in_secs: 300
lock_ttl_secs: 30
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub address: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub token: TokenConfig,
    pub lock_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_conn: u32,
    pub idle_conn: u32,
    pub lifetime_secs: u64,
    pub dial_retry: u32,
    pub dial_interval_ms: u64,
    pub dial_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub address: String,
    pub password: String,
    pub db: i64,
    pub dial_retry: u32,
    pub dial_interval_ms: u64,
    pub dial_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub expires_in_secs: u64,
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.db_host.is_none()
            && self.db_port.is_none()
            && self.db_name.is_none()
            && self.db_user.is_none()
    }
}

impl AppConfig {
    /// Load configuration from defaults, `path`, the environment and `overrides`.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(BUILTIN_CONFIG, FileFormat::Yaml));

        if let Some(path) = path {
            for file in config_files(path)? {
                info!("Loading config file: {}", file.display());
                builder = builder.add_source(File::from(file).required(true));
            }
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.host", overrides.db_host.clone())?
            .set_override_option("database.port", overrides.db_port.map(i64::from))?
            .set_override_option("database.name", overrides.db_name.clone())?
            .set_override_option("database.user", overrides.db_user.clone())?;

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.secret.is_empty() {
            bail!("token.secret must not be empty");
        }
        if self.token.secret == DEFAULT_SECRET {
            warn!("token.secret is the built-in default (insecure for production)");
        }
        if self.token.expires_in_secs == 0
            || self.token.expires_in_secs > MAX_TOKEN_EXPIRES_IN_SECS
        {
            bail!(
                "token.expires_in_secs must be between 1 and {}",
                MAX_TOKEN_EXPIRES_IN_SECS
            );
        }
        if self.lock_ttl_secs == 0 || self.lock_ttl_secs > MAX_LOCK_TTL_SECS {
            bail!("lock_ttl_secs must be between 1 and {}", MAX_LOCK_TTL_SECS);
        }
        if self.database.dial_retry == 0 || self.redis.dial_retry == 0 {
            bail!("dial_retry must be greater than zero");
        }
        if self.database.idle_conn > self.database.max_conn {
            bail!(
                "database.idle_conn ({}) exceeds database.max_conn ({})",
                self.database.idle_conn,
                self.database.max_conn
            );
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

impl DatabaseConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.dial_retry, Duration::from_millis(self.dial_interval_ms))
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// `host:port/name`, for logs
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.name)
    }
}

impl RedisConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.dial_retry, Duration::from_millis(self.dial_interval_ms))
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}/{}", self.address, self.db)
        } else {
            format!(
                "redis://:{}@{}/{}",
                urlencoding::encode(&self.password),
                self.address,
                self.db
            )
        }
    }
}

impl TokenConfig {
    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in_secs)
    }
}

/// A single file, or every `*config.yml` / `*config.yaml` in a directory in name order
fn config_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to open config {}", path.display()))?;

    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to read config directory {}", path.display()))?
    {
        let file = entry?.path();
        let is_config = file
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with("config.yml") || name.ends_with("config.yaml"))
            .unwrap_or(false);
        if is_config && file.is_file() {
            files.push(file);
        }
    }
    files.sort();

    Ok(files)
}
