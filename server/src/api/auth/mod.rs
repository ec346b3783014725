//! Authentication and admission

pub mod claims;
pub mod extractors;
pub mod middleware;

pub use claims::{AccessClaims, ClaimsError};
pub use extractors::Access;
pub use middleware::AuthState;
