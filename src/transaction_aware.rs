use async_trait::async_trait;

/// Error type for transaction-aware operations
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Transaction already committed or rolled back")]
    AlreadyFinished,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result type for transaction-aware operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Observers are registered with a [`SqlUnitOfWorkSession`] and run after the
/// session's shared transaction ends. Every repository obtained from
/// [`SqlUnitOfWorkSession::repository`] writes through that transaction, so
/// an observer sees the combined outcome of all of them.
///
/// [`SqlUnitOfWorkSession`]: crate::SqlUnitOfWorkSession
/// [`SqlUnitOfWorkSession::repository`]: crate::SqlUnitOfWorkSession::repository
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> TransactionResult<()>;

    /// Called after a transaction rollback.
    ///
    /// Rows written by the session's repositories are gone at this point;
    /// anything derived from them should be discarded.
    async fn on_rollback(&self) -> TransactionResult<()>;
}
