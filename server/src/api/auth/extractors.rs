//! Claims extractors for handlers behind the admission middleware

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::claims::AccessClaims;
use crate::api::types::ApiError;

/// Access claims injected by the admission middleware. Absence means
/// the middleware was not applied, which is a programmer error surfaced
/// as a JWT failure rather than a panic.
pub struct Access(pub AccessClaims);

impl<S> FromRequestParts<S> for Access
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(Access)
            .ok_or_else(|| {
                tracing::error!("request reached a handler without access claims");
                ApiError::Jwt
            })
    }
}
