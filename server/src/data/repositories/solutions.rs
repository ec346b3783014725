//! Solution repository: one row per (team, problem)

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::SolutionRow;

pub async fn upsert(
    pool: &SqlitePool,
    team_id: &str,
    problem_id: &str,
    value: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO solutions (team_id, problem_id, value) VALUES (?, ?, ?)
         ON CONFLICT (team_id, problem_id) DO UPDATE SET value = excluded.value",
    )
    .bind(team_id)
    .bind(problem_id)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, team_id: &str, problem_id: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM solutions WHERE team_id = ? AND problem_id = ?")
        .bind(team_id)
        .bind(problem_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn for_team(pool: &SqlitePool, team_id: &str) -> Result<Vec<SolutionRow>, DbError> {
    let rows = sqlx::query_as::<_, SolutionRow>(
        "SELECT team_id, problem_id, value FROM solutions WHERE team_id = ?",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let pool = test_pool().await;

        upsert(&pool, "t1", "p1", 1).await.unwrap();
        upsert(&pool, "t1", "p1", 42).await.unwrap();

        let rows = for_team(&pool, "t1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 42);
    }

    #[tokio::test]
    async fn test_delete_and_team_isolation() {
        let pool = test_pool().await;

        upsert(&pool, "t1", "p1", 1).await.unwrap();
        upsert(&pool, "t2", "p1", 2).await.unwrap();

        delete(&pool, "t1", "p1").await.unwrap();
        assert!(for_team(&pool, "t1").await.unwrap().is_empty());
        assert_eq!(for_team(&pool, "t2").await.unwrap().len(), 1);
    }
}
