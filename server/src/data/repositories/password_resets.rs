//! Password reset tokens (TTL-bounded)

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::PasswordResetRow;

pub async fn insert(
    pool: &SqlitePool,
    user_id: &str,
    token: &str,
    ttl: i64,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO password_resets (user_id, token, ttl) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(ttl)
        .execute(pool)
        .await?;
    Ok(())
}

/// Look up an unexpired reset by token. Expired rows are invisible here
/// and removed by the periodic sweep.
pub async fn find_valid(
    pool: &SqlitePool,
    token: &str,
    now: i64,
) -> Result<Option<PasswordResetRow>, DbError> {
    let row = sqlx::query_as::<_, PasswordResetRow>(
        "SELECT user_id, token, ttl FROM password_resets WHERE token = ? AND ttl > ?",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_for_user(pool: &SqlitePool, user_id: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_expired(pool: &SqlitePool, now: i64) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM password_resets WHERE ttl <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
