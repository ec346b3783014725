//! Admission middleware
//!
//! Every non-anonymous router runs one of these before its handlers
//! (and before any streaming loop starts), so an unauthorized or
//! out-of-window caller is rejected before a bus subscription exists.
//! Validated claims are injected into request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use sqlx::SqlitePool;

use super::claims::{self, AccessClaims, ClaimsError};
use crate::api::types::ApiError;
use crate::data::repositories::info;

/// Shared admission state
#[derive(Clone)]
pub struct AuthState {
    pub pool: SqlitePool,
    pub key: Arc<Vec<u8>>,
}

/// Bearer token from the `Authorization` header. The `Bearer ` prefix
/// (and the `Bearer: ` variant some clients send) is tolerated but not
/// required.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer: ")
        .or_else(|| value.strip_prefix("Bearer "))
        .unwrap_or(value)
        .trim();
    (!token.is_empty()).then_some(token)
}

fn access_claims(state: &AuthState, headers: &HeaderMap) -> Result<AccessClaims, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    claims::validate_access_token(token, &state.key).map_err(|e| match e {
        ClaimsError::Expired => ApiError::TokenExpired,
        _ => ApiError::Unauthorized,
    })
}

/// Authenticated caller; team membership rules are per-operation
pub async fn require_access(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = access_claims(&state, request.headers())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Authenticated caller with the admin flag
pub async fn require_admin(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = access_claims(&state, request.headers())?;
    if !claims.is_admin {
        return Err(ApiError::NotAdmin);
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Authenticated contestant with a team, held at the door until the
/// contest starts. The stored window is re-read after every sleep so a
/// super-admin moving the start instant is honoured; client disconnect
/// drops this future and with it the wait.
pub async fn require_competitor(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = access_claims(&state, request.headers())?;
    if claims.team.is_empty() {
        return Err(ApiError::NoTeam);
    }

    wait_for_start(&state.pool).await?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

async fn wait_for_start(pool: &SqlitePool) -> Result<(), ApiError> {
    loop {
        let info = info::get(pool).await?.ok_or(ApiError::Database)?;
        let wait_secs = info.start_time - Utc::now().timestamp();
        if wait_secs <= 0 {
            return Ok(());
        }
        tokio::time::sleep(std::time::Duration::from_secs(wait_secs as u64)).await;
    }
}

/// Keyed super-admin token; the role is the identity
pub async fn require_super_admin(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized)?;
    claims::validate_super_admin_token(token, &state.key).map_err(|e| match e {
        ClaimsError::Expired => ApiError::TokenExpired,
        _ => ApiError::Unauthorized,
    })?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_prefix_optional() {
        assert_eq!(bearer_token(&headers("abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer: abc")), Some("abc"));
    }

    #[test]
    fn test_missing_or_empty_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
    }

    #[tokio::test]
    async fn test_wait_for_start_without_window_is_database_error() {
        let pool = crate::data::test_pool().await;
        assert_eq!(wait_for_start(&pool).await.unwrap_err(), ApiError::Database);
    }

    #[tokio::test]
    async fn test_wait_for_start_blocks_until_start() {
        let pool = crate::data::test_pool().await;
        let now = Utc::now().timestamp();
        info::set(&pool, now + 3600, now + 7200).await.unwrap();

        let wait = wait_for_start(&pool);
        tokio::select! {
            _ = wait => panic!("gate opened before the contest start"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
        }

        info::set(&pool, now - 1, now + 7200).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), wait_for_start(&pool))
            .await
            .expect("gate should open once the start has passed")
            .unwrap();
    }
}
