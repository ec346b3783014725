//! Team repository
//!
//! Multi-row invariants (one team per user, owner membership) are held
//! by the schema and by the team service's mutation mutex; this module
//! is plain row access.

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::{TeamMemberRow, TeamRow};

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    owner: &str,
    join_code: &str,
) -> Result<TeamRow, DbError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO teams (id, name, owner, co_owner, locked, join_code)
         VALUES (?, ?, ?, NULL, 0, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(owner)
    .bind(join_code)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO team_members (team_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(owner)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(TeamRow {
        id,
        name: name.to_string(),
        owner: owner.to_string(),
        co_owner: None,
        locked: false,
        join_code: join_code.to_string(),
    })
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<TeamRow>, DbError> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<TeamRow>, DbError> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_join_code(pool: &SqlitePool, code: &str) -> Result<Option<TeamRow>, DbError> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE join_code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Team currently containing the user, if any. This is the source of
/// truth for the `team` claim stamped into access tokens.
pub async fn find_by_member(pool: &SqlitePool, user_id: &str) -> Result<Option<TeamRow>, DbError> {
    let row = sqlx::query_as::<_, TeamRow>(
        "SELECT t.* FROM teams t
         JOIN team_members m ON m.team_id = t.id
         WHERE m.user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Members with their user profiles, in join order
pub async fn members(pool: &SqlitePool, team_id: &str) -> Result<Vec<TeamMemberRow>, DbError> {
    let rows = sqlx::query_as::<_, TeamMemberRow>(
        "SELECT m.user_id, u.name, u.school, u.class, m.joined_at
         FROM team_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.team_id = ?
         ORDER BY m.joined_at, m.user_id",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn member_count(pool: &SqlitePool, team_id: &str) -> Result<i64, DbError> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM team_members WHERE team_id = ?")
            .bind(team_id)
            .fetch_one(pool)
            .await?;
    Ok(count.0)
}

pub async fn add_member(pool: &SqlitePool, team_id: &str, user_id: &str) -> Result<(), DbError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("INSERT INTO team_members (team_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(team_id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn remove_member(pool: &SqlitePool, team_id: &str, user_id: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_name(pool: &SqlitePool, team_id: &str, name: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE teams SET name = ? WHERE id = ?")
        .bind(name)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_locked(pool: &SqlitePool, team_id: &str, locked: bool) -> Result<(), DbError> {
    sqlx::query("UPDATE teams SET locked = ? WHERE id = ?")
        .bind(locked)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_co_owner(
    pool: &SqlitePool,
    team_id: &str,
    co_owner: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE teams SET co_owner = ? WHERE id = ?")
        .bind(co_owner)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_join_code(pool: &SqlitePool, team_id: &str, code: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE teams SET join_code = ? WHERE id = ?")
        .bind(code)
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a team and its membership rows
pub async fn delete(pool: &SqlitePool, team_id: &str) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM team_members WHERE team_id = ?")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repositories::users;
    use crate::data::test_pool;

    async fn user(pool: &SqlitePool, email: &str) -> String {
        users::create(pool, email, "hash", "test", "test", 0)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_includes_owner_as_member() {
        let pool = test_pool().await;
        let owner = user(&pool, "a@test.test").await;

        let team = create(&pool, "test", &owner, "ABC123").await.unwrap();
        let members = members(&pool, &team.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, owner);

        let found = find_by_member(&pool, &owner).await.unwrap().unwrap();
        assert_eq!(found.id, team.id);
    }

    #[tokio::test]
    async fn test_user_in_at_most_one_team() {
        let pool = test_pool().await;
        let a = user(&pool, "a@test.test").await;
        let b = user(&pool, "b@test.test").await;

        let t1 = create(&pool, "one", &a, "AAAAAA").await.unwrap();
        let t2 = create(&pool, "two", &b, "BBBBBB").await.unwrap();
        add_member(&pool, &t1.id, &b).await.unwrap_err();

        remove_member(&pool, &t2.id, &b).await.unwrap();
        add_member(&pool, &t1.id, &b).await.unwrap();
    }

    #[tokio::test]
    async fn test_join_code_unique() {
        let pool = test_pool().await;
        let a = user(&pool, "a@test.test").await;
        let b = user(&pool, "b@test.test").await;

        create(&pool, "one", &a, "SAME00").await.unwrap();
        let err = create(&pool, "two", &b, "SAME00").await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete_removes_membership() {
        let pool = test_pool().await;
        let a = user(&pool, "a@test.test").await;

        let team = create(&pool, "test", &a, "ABC123").await.unwrap();
        delete(&pool, &team.id).await.unwrap();

        assert!(find_by_member(&pool, &a).await.unwrap().is_none());
        assert!(find_by_id(&pool, &team.id).await.unwrap().is_none());
    }
}
