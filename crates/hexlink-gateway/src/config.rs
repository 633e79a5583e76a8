use anyhow::Context;
use clap::{Parser, ValueEnum};
use hexlink_core::Shortener;
use hexlink_deriver::{DeriveError, DeriverSettings, DigestAlgorithm, DigestDeriver};
use hexlink_shortener::{MappingResolver, ResolverSettings, WriteMode};
use hexlink_storage::{InMemoryStore, RedisStore};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const LISTEN_ADDR_ENV: &str = "HEXLINK_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "HEXLINK_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "HEXLINK_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "HEXLINK_REDIS_URL";
pub const DIGEST_ENV: &str = "HEXLINK_DIGEST";
pub const KEY_BYTES_ENV: &str = "HEXLINK_KEY_BYTES";
pub const MAX_ATTEMPTS_ENV: &str = "HEXLINK_MAX_ATTEMPTS";
pub const WRITE_MODE_ENV: &str = "HEXLINK_WRITE_MODE";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    #[value(name = "if-absent")]
    IfAbsent,
    #[value(name = "upsert")]
    Upsert,
}

impl Display for WriteModeArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteModeArg::IfAbsent => write!(f, "if-absent"),
            WriteModeArg::Upsert => write!(f, "upsert"),
        }
    }
}

impl From<WriteModeArg> for WriteMode {
    fn from(arg: WriteModeArg) -> Self {
        match arg {
            WriteModeArg::IfAbsent => WriteMode::IfAbsent,
            WriteModeArg::Upsert => WriteMode::Upsert,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hexlink-gateway")]
pub struct Config {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public base that short keys are appended to.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = DIGEST_ENV, default_value = "md5")]
    pub digest: DigestAlgorithm,

    /// Digest bytes kept per key; the key is twice as many hex characters.
    #[arg(long, env = KEY_BYTES_ENV, default_value_t = 3)]
    pub key_bytes: usize,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = hexlink_shortener::resolver::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[arg(
        long,
        env = WRITE_MODE_ENV,
        value_enum,
        default_value_t = WriteModeArg::IfAbsent
    )]
    pub write_mode: WriteModeArg,
}

impl Config {
    pub fn deriver(&self) -> Result<DigestDeriver, DeriveError> {
        DigestDeriver::new(
            DeriverSettings::builder()
                .algorithm(self.digest)
                .key_bytes(self.key_bytes)
                .build(),
        )
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings::builder()
            .max_attempts(self.max_attempts)
            .write_mode(self.write_mode.into())
            .build()
    }

    /// Wires the deriver, the selected store and the resolver together.
    pub async fn build_shortener(&self) -> anyhow::Result<Arc<dyn Shortener>> {
        let deriver = self.deriver()?;
        let settings = self.resolver_settings();
        info!(
            storage = %self.storage,
            digest = %self.digest,
            key_bytes = self.key_bytes,
            key_space = %deriver.key_space(),
            max_attempts = settings.max_attempts,
            write_mode = %self.write_mode,
            "building shortener"
        );

        let shortener: Arc<dyn Shortener> = match self.storage {
            StorageBackendArg::InMemory => Arc::new(MappingResolver::with_settings(
                InMemoryStore::new(),
                deriver,
                settings,
            )),
            StorageBackendArg::Redis => {
                let url = self
                    .redis_url
                    .as_deref()
                    .context("redis storage selected without a redis url")?;
                let store = RedisStore::connect(url)
                    .await
                    .context("failed to connect to redis")?;
                Arc::new(MappingResolver::with_settings(store, deriver, settings))
            }
        };

        Ok(shortener)
    }
}
