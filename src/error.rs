use crate::TransactionError;

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unsupported database url scheme: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid page request: {0}")]
    InvalidPage(String),

    #[error("A transaction is already open on this repository")]
    TransactionAlreadyOpen,

    #[error("No open transaction")]
    NoTransaction,

    #[error("Transaction belongs to a unit of work session")]
    SessionTransaction,

    #[error("Insert into {0} did not report a generated key")]
    MissingGeneratedKey(&'static str),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
