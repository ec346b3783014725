//! Schema definitions
//!
//! Initial schema with all tables, applied idempotently at startup.

pub const SCHEMA: &str = r#"
-- =============================================================================
-- Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    school TEXT NOT NULL,
    class INTEGER NOT NULL DEFAULT 0,
    is_admin INTEGER NOT NULL DEFAULT 0
);

-- =============================================================================
-- Password resets (TTL rows, swept periodically)
-- =============================================================================
CREATE TABLE IF NOT EXISTS password_resets (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token TEXT NOT NULL UNIQUE,
    ttl INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_password_resets_ttl ON password_resets(ttl);

-- =============================================================================
-- Teams
-- =============================================================================
CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    owner TEXT NOT NULL REFERENCES users(id),
    co_owner TEXT REFERENCES users(id),
    locked INTEGER NOT NULL DEFAULT 0,
    join_code TEXT NOT NULL UNIQUE
);

-- A user belongs to at most one team at any instant; UNIQUE(user_id)
-- makes that structural instead of a read-check.
CREATE TABLE IF NOT EXISTS team_members (
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
    joined_at INTEGER NOT NULL,
    PRIMARY KEY (team_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id);

-- =============================================================================
-- Problems (dense positions, answer key in `solution`)
-- =============================================================================
CREATE TABLE IF NOT EXISTS problems (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL DEFAULT '',
    image TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL UNIQUE,
    solution INTEGER NOT NULL DEFAULT 0
);

-- =============================================================================
-- Solutions (one row per team/problem)
-- =============================================================================
CREATE TABLE IF NOT EXISTS solutions (
    team_id TEXT NOT NULL,
    problem_id TEXT NOT NULL,
    value INTEGER NOT NULL,
    PRIMARY KEY (team_id, problem_id)
);

-- =============================================================================
-- History (append-only solution mutation log, in milliseconds)
-- =============================================================================
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id TEXT NOT NULL,
    problem_id TEXT NOT NULL,
    value INTEGER NOT NULL,
    time INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_time ON history(time);

-- =============================================================================
-- Contest window (singleton, unix seconds)
-- =============================================================================
CREATE TABLE IF NOT EXISTS info (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL
);
"#;
