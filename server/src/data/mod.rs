//! Data storage layer
//!
//! One sqlite database holds every persistent collection: users,
//! password resets, teams, problems, solutions, history and the contest
//! window. Repositories are plain functions over the pool; multi-row
//! mutations (position shifts, team membership) run inside transactions.

pub mod error;
pub mod repositories;
pub mod schema;
pub mod types;

pub use error::DbError;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::core::constants::{CLEANUP_INTERVAL, DB_BUSY_TIMEOUT, DB_CONNECT_TIMEOUT};

/// Database service owning the connection pool
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect and apply the schema. Bounded by the startup connect
    /// timeout; a store that cannot be reached is a fatal error.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(DB_BUSY_TIMEOUT);

        let pool = tokio::time::timeout(
            DB_CONNECT_TIMEOUT,
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options),
        )
        .await
        .map_err(|_| DbError::ConnectTimeout)??;

        sqlx::raw_sql(schema::SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Periodic sweep of TTL-expired password-reset rows.
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let now = chrono::Utc::now().timestamp();
                match repositories::password_resets::delete_expired(&pool, now).await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(removed = n, "Swept expired password resets"),
                    Err(e) => tracing::warn!(error = %e, "Password reset sweep failed"),
                }
            }
        })
    }
}

/// In-memory pool for repository and service tests
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::raw_sql(schema::SCHEMA).execute(&pool).await.unwrap();
    pool
}
