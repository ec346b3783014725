//! Problem repository
//!
//! Positions are dense: `[0, n-1]` with a unique index. Shifts run as
//! two sign-flip passes inside one transaction so the index holds after
//! every statement.

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::ProblemRow;

/// Insert an empty problem at `position`, shifting everything at or
/// after it one slot down the list.
pub async fn insert_at(pool: &SqlitePool, position: i64) -> Result<ProblemRow, DbError> {
    let id = cuid2::create_id();

    let mut tx = pool.begin().await?;

    // p -> -(p+1) for p >= position, then negate back: net shift of +1
    sqlx::query("UPDATE problems SET position = -position - 1 WHERE position >= ?")
        .bind(position)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE problems SET position = -position WHERE position < 0")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO problems (id, body, image, position, solution) VALUES (?, '', '', ?, 0)",
    )
    .bind(&id)
    .bind(position)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ProblemRow {
        id,
        body: String::new(),
        image: String::new(),
        position,
        solution: 0,
    })
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<ProblemRow>, DbError> {
    let row = sqlx::query_as::<_, ProblemRow>("SELECT * FROM problems WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn all(pool: &SqlitePool) -> Result<Vec<ProblemRow>, DbError> {
    let rows = sqlx::query_as::<_, ProblemRow>("SELECT * FROM problems ORDER BY position")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Replace body, image and answer key. Returns the updated row, or
/// `None` when the id is unknown.
pub async fn update(
    pool: &SqlitePool,
    id: &str,
    body: &str,
    image: &str,
    solution: i64,
) -> Result<Option<ProblemRow>, DbError> {
    let result = sqlx::query("UPDATE problems SET body = ?, image = ?, solution = ? WHERE id = ?")
        .bind(body)
        .bind(image)
        .bind(solution)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}

/// Remove a problem and close the gap it leaves. Returns the removed
/// row, or `None` when the id is unknown.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<Option<ProblemRow>, DbError> {
    let mut tx = pool.begin().await?;

    let Some(row) =
        sqlx::query_as::<_, ProblemRow>("SELECT * FROM problems WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
    else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM problems WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // q -> -q for q > position, then -q -> q-1: net shift of -1
    sqlx::query("UPDATE problems SET position = -position WHERE position > ?")
        .bind(row.position)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE problems SET position = -position - 1 WHERE position < 0")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(row))
}

/// Exchange the positions of two problems. Returns both rows as they
/// were before the swap, or `None` when either id is unknown.
pub async fn swap(
    pool: &SqlitePool,
    a: &str,
    b: &str,
) -> Result<Option<(ProblemRow, ProblemRow)>, DbError> {
    let mut tx = pool.begin().await?;

    let Some(row_a) = sqlx::query_as::<_, ProblemRow>("SELECT * FROM problems WHERE id = ?")
        .bind(a)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let Some(row_b) = sqlx::query_as::<_, ProblemRow>("SELECT * FROM problems WHERE id = ?")
        .bind(b)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };

    // park A on a temporary slot so the unique index never collides
    sqlx::query("UPDATE problems SET position = -1 WHERE id = ?")
        .bind(a)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE problems SET position = ? WHERE id = ?")
        .bind(row_a.position)
        .bind(b)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE problems SET position = ? WHERE id = ?")
        .bind(row_b.position)
        .bind(a)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some((row_a, row_b)))
}
