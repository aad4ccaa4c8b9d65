use serde::Deserialize;
use std::time::Duration;

use crate::RepositoryResult;

/// Connection settings for a [`ConnectionProvider`](crate::ConnectionProvider).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: None,
            max_lifetime_secs: None,
        }
    }
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Loads settings from the defaults, an optional settings file, then
    /// `DATABASE_*` environment variables (`DATABASE_URL`,
    /// `DATABASE_MAX_CONNECTIONS`, ...), later sources winning.
    pub fn load(path: Option<&str>) -> RepositoryResult<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("url", defaults.url)?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("min_connections", defaults.min_connections)?
            .set_default("acquire_timeout_secs", defaults.acquire_timeout_secs)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("DATABASE").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_secs.map(Duration::from_secs)
    }
}
