//! Contest window singleton

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::InfoRow;

pub async fn get(pool: &SqlitePool) -> Result<Option<InfoRow>, DbError> {
    let row = sqlx::query_as::<_, InfoRow>("SELECT start_time, end_time FROM info WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn set(pool: &SqlitePool, start_time: i64, end_time: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO info (id, start_time, end_time) VALUES (1, ?, ?)
         ON CONFLICT (id) DO UPDATE SET start_time = excluded.start_time,
                                        end_time = excluded.end_time",
    )
    .bind(start_time)
    .bind(end_time)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    #[tokio::test]
    async fn test_singleton_upsert() {
        let pool = test_pool().await;

        assert!(get(&pool).await.unwrap().is_none());

        set(&pool, 100, 200).await.unwrap();
        set(&pool, 300, 400).await.unwrap();

        let info = get(&pool).await.unwrap().unwrap();
        assert_eq!(info.start_time, 300);
        assert_eq!(info.end_time, 400);
    }
}
