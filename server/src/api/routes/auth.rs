//! Authentication and identity endpoints
//!
//! All anonymous. Register and Login mint both token kinds;
//! RefreshToken exchanges a refresh claim for a fresh access claim with
//! the team re-derived from the team collection at mint time.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::api::auth::claims::{self, ClaimsError};
use crate::api::types::ApiError;
use crate::core::constants::RESET_TOKEN_TTL_SECS;
use crate::data::repositories::{password_resets, teams, users};
use crate::data::types::UserRow;
use crate::utils::crypto;
use crate::utils::mail::Mailer;

#[derive(Clone)]
pub struct AuthRoutesState {
    pub pool: SqlitePool,
    pub key: Arc<Vec<u8>>,
    pub mailer: Option<Arc<Mailer>>,
}

pub fn routes(pool: SqlitePool, key: Arc<Vec<u8>>, mailer: Option<Arc<Mailer>>) -> Router {
    let state = AuthRoutesState { pool, key, mailer };

    Router::new()
        .route("/Register", post(register))
        .route("/Login", post(login))
        .route("/RefreshToken", post(refresh_token))
        .route("/ForgotPassword", post(forgot_password))
        .route("/ResetPassword", post(reset_password))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub class: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub refresh_token: String,
    pub access_token: String,
}

/// The team claim is derived from the team collection, never from the
/// user row.
async fn mint_token_pair(
    pool: &SqlitePool,
    user: &UserRow,
    key: &[u8],
) -> Result<TokenPairResponse, ApiError> {
    let team = teams::find_by_member(pool, &user.id)
        .await?
        .map(|t| t.id)
        .unwrap_or_default();

    let refresh_token = claims::new_refresh_token(user, key).map_err(|e| {
        tracing::error!(error = %e, "jwt failure");
        ApiError::Jwt
    })?;
    let access_token = claims::new_access_token(user, &team, key).map_err(|e| {
        tracing::error!(error = %e, "jwt failure");
        ApiError::Jwt
    })?;

    Ok(TokenPairResponse {
        refresh_token,
        access_token,
    })
}

pub async fn register(
    State(state): State<AuthRoutesState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::NameRequired);
    }
    if !request.email.validate_email() {
        return Err(ApiError::EmailAddressFormat);
    }
    if request.password.is_empty() {
        return Err(ApiError::PasswordRequired);
    }
    if request.school.is_empty() {
        return Err(ApiError::SchoolRequired);
    }

    let hash = crypto::hash_password(&request.password).map_err(|e| {
        tracing::error!(error = %e, "failed to hash password");
        ApiError::Cryptographic
    })?;

    let user = users::create(
        &state.pool,
        &request.email,
        &hash,
        &request.name,
        &request.school,
        request.class,
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            tracing::debug!(email = %request.email, "already has an account");
            ApiError::AlreadyExists
        } else {
            e.into()
        }
    })?;

    let tokens = mint_token_pair(&state.pool, &user, &state.key).await?;
    Ok(Json(tokens))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AuthRoutesState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    if request.email.is_empty() {
        return Err(ApiError::EmailRequired);
    }
    if request.password.is_empty() {
        return Err(ApiError::PasswordRequired);
    }

    let user = users::find_by_email(&state.pool, &request.email)
        .await?
        .ok_or(ApiError::InvalidEmailOrPassword)?;

    let valid = crypto::verify_password(&request.password, &user.password).map_err(|e| {
        tracing::error!(error = %e, "password verification failed");
        ApiError::Cryptographic
    })?;
    if !valid {
        tracing::debug!(user_id = %user.id, "invalid password");
        return Err(ApiError::InvalidEmailOrPassword);
    }

    let tokens = mint_token_pair(&state.pool, &user, &state.key).await?;
    Ok(Json(tokens))
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub token: String,
}

pub async fn refresh_token(
    State(state): State<AuthRoutesState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    let refresh = claims::validate_refresh_token(&request.token, &state.key).map_err(|e| match e
    {
        ClaimsError::Expired => ApiError::TokenExpired,
        _ => ApiError::Jwt,
    })?;

    let user = users::find_by_id(&state.pool, &refresh.user_id)
        .await?
        .ok_or(ApiError::Jwt)?;

    let team = teams::find_by_member(&state.pool, &user.id)
        .await?
        .map(|t| t.id)
        .unwrap_or_default();

    let token = claims::new_access_token(&user, &team, &state.key).map_err(|e| {
        tracing::error!(error = %e, "jwt failure");
        ApiError::Jwt
    })?;

    Ok(Json(RefreshTokenResponse { token }))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AuthRoutesState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.email.is_empty() {
        return Err(ApiError::EmailRequired);
    }

    // an unknown address gets the same answer as a known one
    let Some(user) = users::find_by_email(&state.pool, &request.email).await? else {
        return Ok(Json(serde_json::json!({})));
    };

    let mailer = state.mailer.as_ref().ok_or(ApiError::Mail)?;

    let token = Uuid::new_v4().simple().to_string();
    let ttl = (Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS)).timestamp();
    password_resets::insert(&state.pool, &user.id, &token, ttl).await?;

    mailer
        .send_password_reset(&user.email, &token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to send reset mail");
            ApiError::Mail
        })?;

    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AuthRoutesState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.password.is_empty() {
        return Err(ApiError::PasswordRequired);
    }

    let reset = password_resets::find_valid(&state.pool, &request.token, Utc::now().timestamp())
        .await?
        .ok_or(ApiError::InvalidResetToken)?;

    let hash = crypto::hash_password(&request.password).map_err(|e| {
        tracing::error!(error = %e, "failed to hash password");
        ApiError::Cryptographic
    })?;

    users::update_password(&state.pool, &reset.user_id, &hash).await?;
    password_resets::delete_for_user(&state.pool, &reset.user_id).await?;

    Ok(Json(serde_json::json!({})))
}
