//! Generic repository and unit of work over sqlx.
//!
//! A [`Repository`] provides CRUD, filtered listing, paging and batch
//! execution for one [`Entity`] type. SQL text is produced per dialect by the
//! [`SqlAdapter`]. Repositories run each statement on a pooled connection, in
//! a transaction of their own, or in a [`SqlUnitOfWork`] session shared with
//! other repositories.

pub mod adapter;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod repository;
pub mod settings;
pub mod transaction_aware;
pub mod unit_of_work;

pub use adapter::{Dialect, PageRequest, SortDirection, SqlAdapter, SqlBuilder};
pub use connection::ConnectionProvider;
pub use entity::{Entity, TableMeta, Value, ValueKind, ValueType};
pub use error::{RepositoryError, RepositoryResult};
pub use executor::{Executor, Lease};
pub use repository::{BatchOutcome, Repository, TransactionState};
pub use settings::DatabaseSettings;
pub use transaction_aware::{TransactionAware, TransactionError, TransactionResult};
pub use unit_of_work::{SqlUnitOfWork, SqlUnitOfWorkSession, UnitOfWork, UnitOfWorkSession};
