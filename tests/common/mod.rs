pub mod entities;
pub mod observers;

pub use entities::{Order, User};
pub use observers::Recorder;

use uow_repository::{ConnectionProvider, DatabaseSettings};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory SQLite behind a single connection that is never recycled, so
/// every statement sees the same database.
pub async fn setup_sqlite() -> ConnectionProvider {
    init_tracing();
    let settings = DatabaseSettings::new("sqlite::memory:");
    let provider = ConnectionProvider::connect(&settings)
        .await
        .expect("Failed to open sqlite pool");

    sqlx::query(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            age INTEGER NOT NULL
        )
        "#,
    )
    .execute(provider.pool())
    .await
    .expect("Failed to create users table");

    sqlx::query(
        r#"
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            product_name TEXT NOT NULL,
            amount INTEGER NOT NULL
        )
        "#,
    )
    .execute(provider.pool())
    .await
    .expect("Failed to create orders table");

    provider
}
