//! Wire-facing error taxonomy
//!
//! Every error carries a stable `Ennnn: human text` message that clients
//! match on by prefix. Handlers translate store/crypto/mail failures to
//! their infra code; raw internals never reach the wire.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    NotImplemented,
    EmailRequired,
    PasswordRequired,
    InvalidEmailOrPassword,
    Database,
    Cryptographic,
    Jwt,
    NameRequired,
    EmailAddressFormat,
    SchoolRequired,
    AlreadyExists,
    TokenExpired,
    Unauthorized,
    InvalidPosition,
    NotFound,
    InvalidId,
    NotAdmin,
    NoTeam,
    Mail,
    InvalidResetToken,
    Queue,
    InvalidTime,
    TeamNameTaken,
    TeamNameTooLong,
    HasTeam,
    OwnerCantLeave,
    DisbandNonEmptyTeam,
    NotAuthorized,
    TeamLocked,
    Wtf,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotImplemented => "E0000",
            Self::EmailRequired => "E0001",
            Self::PasswordRequired => "E0002",
            Self::InvalidEmailOrPassword => "E0003",
            Self::Database => "E0004",
            Self::Cryptographic => "E0005",
            Self::Jwt => "E0006",
            Self::NameRequired => "E0007",
            Self::EmailAddressFormat => "E0008",
            Self::SchoolRequired => "E0009",
            Self::AlreadyExists => "E0010",
            Self::TokenExpired => "E0011",
            Self::Unauthorized => "E0012",
            Self::InvalidPosition => "E0013",
            Self::NotFound => "E0014",
            Self::InvalidId => "E0015",
            Self::NotAdmin => "E0016",
            Self::NoTeam => "E0017",
            Self::Mail => "E0018",
            Self::InvalidResetToken => "E0019",
            Self::Queue => "E0020",
            Self::InvalidTime => "E0021",
            Self::TeamNameTaken => "E0022",
            Self::TeamNameTooLong => "E0023",
            Self::HasTeam => "E0024",
            Self::OwnerCantLeave => "E0025",
            Self::DisbandNonEmptyTeam => "E0026",
            Self::NotAuthorized => "E0027",
            Self::TeamLocked => "E0028",
            Self::Wtf => "E0029",
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Self::NotImplemented => "not implemented",
            Self::EmailRequired => "email is required",
            Self::PasswordRequired => "password is required",
            Self::InvalidEmailOrPassword => "invalid email or password",
            Self::Database => "database error",
            Self::Cryptographic => "cryptographic failure",
            Self::Jwt => "JWT failure",
            Self::NameRequired => "name is required",
            Self::EmailAddressFormat => "email address format incorrect",
            Self::SchoolRequired => "school is required",
            Self::AlreadyExists => "user already registered",
            Self::TokenExpired => "token expired",
            Self::Unauthorized => "unauthorized",
            Self::InvalidPosition => "invalid position",
            Self::NotFound => "not found",
            Self::InvalidId => "invalid ID",
            Self::NotAdmin => "not admin",
            Self::NoTeam => "no team",
            Self::Mail => "error sending email",
            Self::InvalidResetToken => "reset token invalid",
            Self::Queue => "queue error",
            Self::InvalidTime => "invalid time",
            Self::TeamNameTaken => "team name already taken",
            Self::TeamNameTooLong => "team name too long",
            Self::HasTeam => "already in a team",
            Self::OwnerCantLeave => "owner cannot leave team",
            Self::DisbandNonEmptyTeam => "cannot disband a non-empty team",
            Self::NotAuthorized => "not authorized",
            Self::TeamLocked => "team is locked",
            Self::Wtf => "something went very wrong",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::EmailRequired
            | Self::PasswordRequired
            | Self::NameRequired
            | Self::EmailAddressFormat
            | Self::SchoolRequired
            | Self::InvalidPosition
            | Self::InvalidId
            | Self::InvalidTime
            | Self::TeamNameTooLong => StatusCode::BAD_REQUEST,

            Self::InvalidEmailOrPassword
            | Self::TokenExpired
            | Self::Unauthorized
            | Self::Jwt => StatusCode::UNAUTHORIZED,

            Self::NotAdmin
            | Self::NoTeam
            | Self::HasTeam
            | Self::OwnerCantLeave
            | Self::DisbandNonEmptyTeam
            | Self::NotAuthorized
            | Self::TeamLocked
            | Self::InvalidResetToken => StatusCode::FORBIDDEN,

            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::TeamNameTaken => StatusCode::CONFLICT,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,

            Self::Database | Self::Cryptographic | Self::Mail | Self::Queue | Self::Wtf => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self.status().as_u16() {
            400 => "bad_request",
            401 => "unauthorized",
            403 => "forbidden",
            404 => "not_found",
            409 => "conflict",
            501 => "not_implemented",
            _ => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.text())
    }
}

impl std::error::Error for ApiError {}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        tracing::error!(error = %e, "database error");
        Self::Database
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({
                "error": self.kind(),
                "code": self.code(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_stable_prefix() {
        assert_eq!(
            ApiError::InvalidPosition.to_string(),
            "E0013: invalid position"
        );
        assert_eq!(ApiError::NoTeam.to_string(), "E0017: no team");
        assert_eq!(
            ApiError::TeamNameTaken.to_string(),
            "E0022: team name already taken"
        );
    }

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ApiError::NotImplemented,
            ApiError::EmailRequired,
            ApiError::PasswordRequired,
            ApiError::InvalidEmailOrPassword,
            ApiError::Database,
            ApiError::Cryptographic,
            ApiError::Jwt,
            ApiError::NameRequired,
            ApiError::EmailAddressFormat,
            ApiError::SchoolRequired,
            ApiError::AlreadyExists,
            ApiError::TokenExpired,
            ApiError::Unauthorized,
            ApiError::InvalidPosition,
            ApiError::NotFound,
            ApiError::InvalidId,
            ApiError::NotAdmin,
            ApiError::NoTeam,
            ApiError::Mail,
            ApiError::InvalidResetToken,
            ApiError::Queue,
            ApiError::InvalidTime,
            ApiError::TeamNameTaken,
            ApiError::TeamNameTooLong,
            ApiError::HasTeam,
            ApiError::OwnerCantLeave,
            ApiError::DisbandNonEmptyTeam,
            ApiError::NotAuthorized,
            ApiError::TeamLocked,
            ApiError::Wtf,
        ];
        let mut codes: Vec<&str> = all.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_infra_errors_hide_details() {
        let e: ApiError = DbError::ConnectTimeout.into();
        assert_eq!(e, ApiError::Database);
    }
}
