use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{Any, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ConnectionProvider, Entity, Executor, Repository, TransactionAware, TransactionResult};

/// Unit of Work pattern for managing database transactions.
///
/// The UnitOfWork manages the lifecycle of database transactions and provides
/// a factory method to create new transaction sessions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> TransactionResult<Self::Session>;
}

/// Represents a single database transaction session.
///
/// This trait provides the core transaction management operations and a
/// mechanism to register transaction-aware components that need to be
/// notified of transaction lifecycle events.
#[async_trait]
pub trait UnitOfWorkSession: Send + Sync {
    /// Get the executor for this session (provides access to the transaction).
    fn executor(&self) -> &Executor;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction and notify all registered observers.
    async fn commit(self) -> TransactionResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(self) -> TransactionResult<()>;
}

/// UnitOfWork over the pool of a [`ConnectionProvider`].
pub struct SqlUnitOfWork {
    provider: ConnectionProvider,
}

impl SqlUnitOfWork {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    type Session = SqlUnitOfWorkSession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let tx = self.provider.pool().begin().await?;
        let session = SqlUnitOfWorkSession::new(tx, self.provider.clone());
        tracing::debug!(session_id = %session.id(), "Unit of work started");
        Ok(session)
    }
}

/// Transaction session handed out by [`SqlUnitOfWork`].
pub struct SqlUnitOfWorkSession {
    id: Uuid,
    provider: ConnectionProvider,
    executor: Executor,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl SqlUnitOfWorkSession {
    /// Create a new session from an open transaction.
    pub fn new(tx: Transaction<'static, Any>, provider: ConnectionProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            executor: Executor::new(tx),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// A repository whose statements run in this session's transaction.
    pub fn repository<T: Entity>(&self) -> Repository<T> {
        Repository::with_executor(&self.provider, self.executor.clone())
    }
}

#[async_trait]
impl UnitOfWorkSession for SqlUnitOfWorkSession {
    fn executor(&self) -> &Executor {
        &self.executor
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.commit().await?;
        tracing::info!(session_id = %self.id, "Unit of work committed");

        // Notify observers after successful commit
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            observer.on_commit().await?;
        }
        Ok(())
    }

    async fn rollback(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.rollback().await?;
        tracing::info!(session_id = %self.id, "Unit of work rolled back");

        // Notify observers after successful rollback
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            observer.on_rollback().await?;
        }
        Ok(())
    }
}
