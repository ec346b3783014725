//! Data layer error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("database connect timed out")]
    ConnectTimeout,
}

impl DbError {
    /// True when the underlying failure is a unique-index violation,
    /// used to map duplicate emails, team names and join codes to their
    /// wire errors instead of a generic database error.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}
