use sqlx::Any;
use std::marker::PhantomData;

use crate::adapter::{bind_all, Dialect, PageRequest, SqlAdapter, SqlBuilder};
use crate::entity::{Entity, TableMeta, Value};
use crate::executor::{Executor, Lease};
use crate::{ConnectionProvider, RepositoryError, RepositoryResult};

/// Whether a repository currently runs inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Closed,
}

/// Result of [`Repository::insert_batch`] when no driver error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch affected rows and was committed.
    Committed { rows_affected: u64 },
    /// The batch affected no rows and was rolled back.
    RolledBack,
}

impl BatchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, BatchOutcome::Committed { .. })
    }
}

enum Scope {
    Autocommit,
    /// Transaction opened by this repository.
    Owned(Executor),
    /// Transaction of a unit of work session, committed by the session.
    Session(Executor),
}

/// Generic repository over the table mapped by `T`.
///
/// Statements run on a connection leased from the pool for their duration,
/// or inside the open transaction when there is one. Dropping a repository
/// with an open transaction rolls it back.
pub struct Repository<T: Entity> {
    provider: ConnectionProvider,
    adapter: SqlAdapter,
    scope: Scope,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(provider: &ConnectionProvider) -> Self {
        Self {
            provider: provider.clone(),
            adapter: provider.adapter(),
            scope: Scope::Autocommit,
            _entity: PhantomData,
        }
    }

    /// A repository that writes through an existing (session) transaction.
    pub fn with_executor(provider: &ConnectionProvider, executor: Executor) -> Self {
        Self {
            scope: Scope::Session(executor),
            ..Self::new(provider)
        }
    }

    pub fn table_name(&self) -> &'static str {
        T::TABLE
    }

    pub fn dialect(&self) -> Dialect {
        self.adapter.dialect()
    }

    /// `Open` while this repository's own transaction, or the session
    /// transaction it joined, has not been committed or rolled back.
    pub fn transaction_state(&self) -> TransactionState {
        match &self.scope {
            Scope::Owned(executor) | Scope::Session(executor) if executor.is_active() => {
                TransactionState::Open
            }
            _ => TransactionState::Closed,
        }
    }

    async fn lease(&self) -> RepositoryResult<Lease<'_>> {
        match &self.scope {
            Scope::Autocommit => Ok(Lease::Pooled(self.provider.pool().acquire().await?)),
            Scope::Owned(executor) | Scope::Session(executor) => Ok(executor.lease().await),
        }
    }

    async fn fetch_all(&self, stmt: SqlBuilder) -> RepositoryResult<Vec<T>> {
        tracing::debug!(table = T::TABLE, sql = %stmt.sql, "Fetching rows");
        let mut lease = self.lease().await?;
        let rows = sqlx::query_as_with::<Any, T, _>(&stmt.sql, stmt.bind()?)
            .fetch_all(lease.connection()?)
            .await?;
        Ok(rows)
    }

    async fn execute_statement(&self, sql: &str, params: &[Value]) -> RepositoryResult<u64> {
        tracing::debug!(table = T::TABLE, sql = %sql, "Executing statement");
        let mut lease = self.lease().await?;
        let result = sqlx::query_with::<Any, _>(sql, bind_all(params)?)
            .execute(lease.connection()?)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetch one entity by primary key.
    pub async fn query(&self, id: i64) -> RepositoryResult<Option<T>> {
        let stmt = self.adapter.select_by_key(&TableMeta::of::<T>(), id);
        tracing::debug!(table = T::TABLE, id, "Fetching by key");
        let mut lease = self.lease().await?;
        let row = sqlx::query_as_with::<Any, T, _>(&stmt.sql, stmt.bind()?)
            .fetch_optional(lease.connection()?)
            .await?;
        Ok(row)
    }

    /// List rows matching `filter` (without the `WHERE` keyword), or every row
    /// when the filter is empty. Use placeholders and `params` for values.
    pub async fn query_list(&self, filter: Option<&str>, params: Vec<Value>) -> RepositoryResult<Vec<T>> {
        let stmt = self.adapter.filtered_list(&TableMeta::of::<T>(), filter, params);
        self.fetch_all(stmt).await
    }

    /// One ordered page of rows.
    pub async fn query_page(&self, request: &PageRequest) -> RepositoryResult<Vec<T>> {
        let stmt = self.adapter.page_list(&TableMeta::of::<T>(), request)?;
        self.fetch_all(stmt).await
    }

    pub async fn count(&self, filter: Option<&str>, params: Vec<Value>) -> RepositoryResult<i64> {
        let stmt = self.adapter.count(&TableMeta::of::<T>(), filter, params);
        tracing::debug!(table = T::TABLE, sql = %stmt.sql, "Counting rows");
        let mut lease = self.lease().await?;
        let count = sqlx::query_scalar_with::<Any, i64, _>(&stmt.sql, stmt.bind()?)
            .fetch_one(lease.connection()?)
            .await?;
        Ok(count)
    }

    /// Insert `entity` and return its key, database-generated unless the
    /// entity declares `KEY_GENERATED = false`.
    pub async fn insert(&self, entity: &T) -> RepositoryResult<i64> {
        let meta = TableMeta::of::<T>();
        let stmt = self.adapter.insert(&meta, entity.key(), entity.values());
        tracing::debug!(table = T::TABLE, sql = %stmt.sql, "Inserting row");

        let mut lease = self.lease().await?;
        if !meta.key_generated {
            sqlx::query_with::<Any, _>(&stmt.sql, stmt.bind()?)
                .execute(lease.connection()?)
                .await?;
            return Ok(entity.key());
        }

        if self.dialect().returns_generated_key() {
            let key = sqlx::query_scalar_with::<Any, i64, _>(&stmt.sql, stmt.bind()?)
                .fetch_one(lease.connection()?)
                .await?;
            return Ok(key);
        }

        sqlx::query_with::<Any, _>(&stmt.sql, stmt.bind()?)
            .execute(lease.connection()?)
            .await?
            .last_insert_id()
            .ok_or(RepositoryError::MissingGeneratedKey(T::TABLE))
    }

    /// Update the row keyed by `entity`. Returns whether a row was changed.
    pub async fn update(&self, entity: &T) -> RepositoryResult<bool> {
        let stmt = self
            .adapter
            .update(&TableMeta::of::<T>(), entity.key(), entity.values());
        Ok(self.execute_statement(&stmt.sql, &stmt.arguments).await? > 0)
    }

    /// Delete the row keyed by `entity`. Returns whether a row was removed.
    pub async fn delete(&self, entity: &T) -> RepositoryResult<bool> {
        let stmt = self.adapter.delete(&TableMeta::of::<T>(), entity.key());
        Ok(self.execute_statement(&stmt.sql, &stmt.arguments).await? > 0)
    }

    /// Run an arbitrary statement in the current scope and return the number
    /// of affected rows.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> RepositoryResult<u64> {
        self.execute_statement(sql, &params).await
    }

    /// Begin a transaction that subsequent operations run in.
    pub async fn open_transaction(&mut self) -> RepositoryResult<()> {
        if !matches!(self.scope, Scope::Autocommit) {
            return Err(RepositoryError::TransactionAlreadyOpen);
        }
        let tx = self.provider.pool().begin().await?;
        self.scope = Scope::Owned(Executor::new(tx));
        tracing::debug!(table = T::TABLE, "Transaction opened");
        Ok(())
    }

    /// Commit the open transaction. The repository is back in autocommit
    /// mode afterwards, whether or not the commit succeeded.
    pub async fn commit(&mut self) -> RepositoryResult<()> {
        let executor = self.close_scope()?;
        executor.take_transaction().await?.commit().await?;
        tracing::debug!(table = T::TABLE, "Transaction committed");
        Ok(())
    }

    /// Roll back the open transaction. The repository is back in autocommit
    /// mode afterwards, whether or not the rollback succeeded.
    pub async fn rollback(&mut self) -> RepositoryResult<()> {
        let executor = self.close_scope()?;
        executor.take_transaction().await?.rollback().await?;
        tracing::debug!(table = T::TABLE, "Transaction rolled back");
        Ok(())
    }

    fn close_scope(&mut self) -> RepositoryResult<Executor> {
        match std::mem::replace(&mut self.scope, Scope::Autocommit) {
            Scope::Owned(executor) => Ok(executor),
            Scope::Autocommit => Err(RepositoryError::NoTransaction),
            session @ Scope::Session(_) => {
                self.scope = session;
                Err(RepositoryError::SessionTransaction)
            }
        }
    }

    /// Run `sql` once per entity, binding each entity's column values in
    /// declared order, inside a transaction of its own.
    ///
    /// The transaction is committed when the batch affected at least one row
    /// and rolled back otherwise. A driver error rolls the batch back and is
    /// returned. In every case the repository leaves with no open transaction.
    #[tracing::instrument(skip_all, fields(table = T::TABLE, entities = entities.len()))]
    pub async fn insert_batch(&mut self, sql: &str, entities: &[T]) -> RepositoryResult<BatchOutcome> {
        self.open_transaction().await?;

        let mut rows_affected = 0;
        let mut failure = None;
        for entity in entities {
            match self.execute_statement(sql, &entity.values()).await {
                Ok(rows) => rows_affected += rows,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            if let Err(rollback_err) = self.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback after failed batch also failed");
            }
            return Err(err);
        }

        if rows_affected > 0 {
            self.commit().await?;
            tracing::info!(rows_affected, "Batch committed");
            Ok(BatchOutcome::Committed { rows_affected })
        } else {
            self.rollback().await?;
            tracing::info!("Batch affected no rows, rolled back");
            Ok(BatchOutcome::RolledBack)
        }
    }
}
