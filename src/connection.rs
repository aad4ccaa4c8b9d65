use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::adapter::{Dialect, SqlAdapter};
use crate::{DatabaseSettings, RepositoryResult};

/// Opens database connections and hands out the matching SQL adapter.
///
/// Cheap to clone; clones share one pool.
#[derive(Clone, Debug)]
pub struct ConnectionProvider {
    pool: AnyPool,
    dialect: Dialect,
}

impl ConnectionProvider {
    /// Open a pool for `settings.url`.
    pub async fn connect(settings: &DatabaseSettings) -> RepositoryResult<Self> {
        let dialect = Dialect::from_url(&settings.url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout())
            .idle_timeout(settings.idle_timeout())
            .max_lifetime(settings.max_lifetime())
            .connect(&settings.url)
            .await?;

        tracing::debug!(
            ?dialect,
            max_connections = settings.max_connections,
            "Connection pool opened"
        );
        Ok(Self { pool, dialect })
    }

    /// Wrap an existing pool. The dialect must match the pool's backend.
    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn adapter(&self) -> SqlAdapter {
        SqlAdapter::new(self.dialect)
    }

    /// Close the pool, waiting for leased connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
