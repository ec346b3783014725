//! Append-only log of solution mutations, read back only by the
//! results aggregator.

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::HistoryRow;

pub async fn append(
    pool: &SqlitePool,
    team_id: &str,
    problem_id: &str,
    value: i64,
    time_ms: i64,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO history (team_id, problem_id, value, time) VALUES (?, ?, ?, ?)")
        .bind(team_id)
        .bind(problem_id)
        .bind(value)
        .bind(time_ms)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn all_ordered(pool: &SqlitePool) -> Result<Vec<HistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT team_id, problem_id, value, time FROM history ORDER BY time, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let pool = test_pool().await;

        append(&pool, "t1", "p1", 1, 1000).await.unwrap();
        append(&pool, "t1", "p1", 2, 3000).await.unwrap();
        append(&pool, "t2", "p1", 3, 2000).await.unwrap();

        let rows = all_ordered(&pool).await.unwrap();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
    }
}
