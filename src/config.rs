use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8090;

/// Ceiling on how long in-flight connections get to finish after an interrupt.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_AUTH_PREFIX: &str = "/book/";

pub const DEFAULT_AUTHOR_SEED: &str = "author.csv";

pub const DEFAULT_BOOK_SEED: &str = "book.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub shutdown_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub auth_prefix: String,
    pub author_seed: PathBuf,
    pub book_seed: PathBuf,
}

impl Config {
    /// Load configuration from the process environment, after `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            host: lookup("BOOKSHELF_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed(&lookup, "BOOKSHELF_PORT", DEFAULT_PORT)?,
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            shutdown_timeout_secs: parsed(
                &lookup,
                "BOOKSHELF_SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            )?,
            request_timeout_secs: parsed(
                &lookup,
                "BOOKSHELF_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            auth_prefix: lookup("BOOKSHELF_AUTH_PREFIX")
                .unwrap_or_else(|| DEFAULT_AUTH_PREFIX.to_string()),
            author_seed: lookup("BOOKSHELF_AUTHOR_SEED")
                .unwrap_or_else(|| DEFAULT_AUTHOR_SEED.to_string())
                .into(),
            book_seed: lookup("BOOKSHELF_BOOK_SEED")
                .unwrap_or_else(|| DEFAULT_BOOK_SEED.to_string())
                .into(),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database_url.trim().is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.shutdown_timeout_secs == 0 {
            anyhow::bail!("Shutdown timeout must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        if !self.auth_prefix.starts_with('/') {
            anyhow::bail!(
                "Auth prefix must start with '/', got {:?}",
                self.auth_prefix
            );
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
