//! Signed bearer claims
//!
//! Three claim kinds, all HMAC-SHA-512 under the process-wide key:
//! refresh (long-lived, only the token-refresh endpoint accepts it),
//! access (carries identity into handlers) and super-admin (the role is
//! the identity).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::core::constants::{ACCESS_TOKEN_TTL_HOURS, JWT_ISSUER, REFRESH_TOKEN_TTL_DAYS};
use crate::data::types::UserRow;

#[derive(Debug)]
pub enum ClaimsError {
    Expired,
    Invalid(String),
    Signing(String),
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "token expired"),
            Self::Invalid(msg) => write!(f, "invalid token: {}", msg),
            Self::Signing(msg) => write!(f, "signing failure: {}", msg),
        }
    }
}

impl std::error::Error for ClaimsError {}

/// Exchangeable for a fresh access token for six months
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// Caller identity attached to every authenticated request. `team` is
/// the id of the team containing the user when the token was minted,
/// empty if none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: String,
    pub is_admin: bool,
    pub team: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperAdminClaims {
    pub is_sa: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

fn sign<T: Serialize>(claims: &T, key: &[u8]) -> Result<String, ClaimsError> {
    encode(
        &Header::new(Algorithm::HS512),
        claims,
        &EncodingKey::from_secret(key),
    )
    .map_err(|e| ClaimsError::Signing(e.to_string()))
}

fn verify<T: DeserializeOwned>(token: &str, key: &[u8]) -> Result<T, ClaimsError> {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.validate_exp = true;

    decode::<T>(token, &DecodingKey::from_secret(key), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ClaimsError::Expired,
            _ => ClaimsError::Invalid(e.to_string()),
        })
}

pub fn new_refresh_token(user: &UserRow, key: &[u8]) -> Result<String, ClaimsError> {
    let now = Utc::now();
    sign(
        &RefreshClaims {
            user_id: user.id.clone(),
            is_admin: user.is_admin,
            exp: (now + Duration::days(REFRESH_TOKEN_TTL_DAYS)).timestamp(),
            iat: now.timestamp(),
            iss: JWT_ISSUER.to_string(),
        },
        key,
    )
}

pub fn new_access_token(user: &UserRow, team: &str, key: &[u8]) -> Result<String, ClaimsError> {
    let now = Utc::now();
    sign(
        &AccessClaims {
            user_id: user.id.clone(),
            is_admin: user.is_admin,
            team: team.to_string(),
            exp: (now + Duration::hours(ACCESS_TOKEN_TTL_HOURS)).timestamp(),
            iat: now.timestamp(),
            iss: JWT_ISSUER.to_string(),
        },
        key,
    )
}

pub fn new_super_admin_token(exp: DateTime<Utc>, key: &[u8]) -> Result<String, ClaimsError> {
    sign(
        &SuperAdminClaims {
            is_sa: true,
            exp: exp.timestamp(),
            iat: Utc::now().timestamp(),
            iss: JWT_ISSUER.to_string(),
        },
        key,
    )
}

pub fn validate_refresh_token(token: &str, key: &[u8]) -> Result<RefreshClaims, ClaimsError> {
    verify(token, key)
}

pub fn validate_access_token(token: &str, key: &[u8]) -> Result<AccessClaims, ClaimsError> {
    verify(token, key)
}

pub fn validate_super_admin_token(
    token: &str,
    key: &[u8],
) -> Result<SuperAdminClaims, ClaimsError> {
    let claims: SuperAdminClaims = verify(token, key)?;
    if !claims.is_sa {
        return Err(ClaimsError::Invalid("not a super-admin token".to_string()));
    }
    Ok(claims)
}
