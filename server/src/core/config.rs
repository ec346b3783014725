//! Application configuration
//!
//! Assembled from CLI flags and environment variables (flags win).
//! The signing key is the only required setting; everything else has a
//! development default.

use anyhow::{Context, Result};

use super::cli::CliConfig;
use super::constants::{DEFAULT_DATABASE_URL, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for all three claim kinds
    pub jwt_key: String,
}

/// Mail provider settings; absent when the deployment has no mail plane
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub domain: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let jwt_key = cli
            .jwt_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("JWT_KEY is required")?;

        let mail = match (&cli.mailgun_domain, &cli.mailgun_api_key) {
            (Some(domain), Some(api_key)) if !domain.is_empty() && !api_key.is_empty() => {
                Some(MailConfig {
                    domain: domain.clone(),
                    api_key: api_key.clone(),
                })
            }
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                port: cli.port.unwrap_or(DEFAULT_PORT),
            },
            database: DatabaseConfig {
                url: cli
                    .database_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            },
            auth: AuthConfig { jwt_key },
            mail,
        })
    }
}
