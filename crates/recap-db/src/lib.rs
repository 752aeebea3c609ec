//! # recap-db
//!
//! PostgreSQL database layer for recap.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for messages, labels, digests, and run locks
//! - SQL migrations for the pipeline schema
//!
//! ## Example
//!
//! ```rust,ignore
//! use recap_db::Database;
//! use recap_core::{MessageRepository, NewMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/recap").await?;
//!
//!     let id = db.messages.append(NewMessage {
//!         chat_id: -100123,
//!         author_ref: "user-42".to_string(),
//!         text: "hello".to_string(),
//!         sent_at: chrono::Utc::now(),
//!     }).await?;
//!
//!     println!("Stored message: {}", id);
//!     Ok(())
//! }
//! ```

pub mod digests;
pub mod labels;
pub mod messages;
pub mod pool;
pub mod run_locks;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use recap_core::*;

// Re-export repository implementations
pub use digests::PgDigestRepository;
pub use labels::PgLabelRepository;
pub use messages::PgMessageRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use run_locks::PgRunLockRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Message store.
    pub messages: PgMessageRepository,
    /// Label store.
    pub labels: PgLabelRepository,
    /// Digest store.
    pub digests: PgDigestRepository,
    /// Run-lock leases.
    pub run_locks: PgRunLockRepository,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the repository set over an existing pool.
    pub fn from_pool(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            messages: PgMessageRepository::new(pool.clone()),
            labels: PgLabelRepository::new(pool.clone()),
            digests: PgDigestRepository::new(pool.clone()),
            run_locks: PgRunLockRepository::new(pool.clone()),
            pool,
        }
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}
