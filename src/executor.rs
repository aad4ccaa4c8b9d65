use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::{RepositoryError, RepositoryResult, TransactionError, TransactionResult};

/// Executor wraps a database transaction for use by repositories.
///
/// Cloning an Executor shares the same transaction, so several repositories
/// created from one unit of work session write through a single transaction.
#[derive(Clone, Debug)]
pub struct Executor {
    tx: Arc<Mutex<Option<Transaction<'static, Any>>>>,
    // Cleared once the transaction is taken for commit or rollback.
    active: Arc<AtomicBool>,
}

impl Executor {
    /// Creates a new Executor from an open transaction.
    pub fn new(tx: Transaction<'static, Any>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Locks the transaction for the duration of one statement.
    pub async fn lease(&self) -> Lease<'_> {
        Lease::Scoped(self.tx.lock().await)
    }

    /// Whether the transaction has not been committed or rolled back yet.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// This should only be called when committing or rolling back.
    pub(crate) async fn take_transaction(&self) -> TransactionResult<Transaction<'static, Any>> {
        let mut guard = self.tx.lock().await;
        self.active.store(false, Ordering::Release);
        guard.take().ok_or(TransactionError::AlreadyFinished)
    }
}

/// A connection borrowed for a single statement.
///
/// Either a connection checked out of the pool, returned when the lease is
/// dropped, or the locked transaction of an [`Executor`].
pub enum Lease<'a> {
    Pooled(PoolConnection<Any>),
    Scoped(MutexGuard<'a, Option<Transaction<'static, Any>>>),
}

impl Lease<'_> {
    pub fn connection(&mut self) -> RepositoryResult<&mut AnyConnection> {
        match self {
            Lease::Pooled(conn) => Ok(&mut **conn),
            Lease::Scoped(guard) => guard
                .as_mut()
                .map(|tx| &mut **tx)
                .ok_or(RepositoryError::NoTransaction),
        }
    }
}
