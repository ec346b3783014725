//! User repository

use sqlx::SqlitePool;

use crate::data::DbError;
use crate::data::types::UserRow;

/// Create a user with a generated id. A duplicate email surfaces as a
/// unique violation for the caller to map.
pub async fn create(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    name: &str,
    school: &str,
    class: i64,
) -> Result<UserRow, DbError> {
    let id = cuid2::create_id();

    sqlx::query(
        "INSERT INTO users (id, email, password, name, school, class, is_admin)
         VALUES (?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(school)
    .bind(class)
    .execute(pool)
    .await?;

    Ok(UserRow {
        id,
        email: email.to_string(),
        password: password_hash.to_string(),
        name: name.to_string(),
        school: school.to_string(),
        class,
        is_admin: false,
    })
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_password(
    pool: &SqlitePool,
    id: &str,
    password_hash: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
