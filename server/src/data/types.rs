//! Row types shared across repositories

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub school: String,
    pub class: i64,
    pub is_admin: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct TeamRow {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub co_owner: Option<String>,
    pub locked: bool,
    pub join_code: String,
}

/// Team member joined with the user profile, ordered by join time
#[derive(Debug, Clone, FromRow)]
pub struct TeamMemberRow {
    pub user_id: String,
    pub name: String,
    pub school: String,
    pub class: i64,
    pub joined_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProblemRow {
    pub id: String,
    pub body: String,
    pub image: String,
    pub position: i64,
    pub solution: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SolutionRow {
    pub team_id: String,
    pub problem_id: String,
    pub value: i64,
}

/// History entry; `time` is unix milliseconds
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub team_id: String,
    pub problem_id: String,
    pub value: i64,
    pub time: i64,
}

/// Contest window; instants are unix seconds
#[derive(Debug, Clone, Copy, FromRow)]
pub struct InfoRow {
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetRow {
    pub user_id: String,
    pub token: String,
    pub ttl: i64,
}
