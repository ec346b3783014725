//! Core application

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use tracing_subscriber::EnvFilter;

use crate::api::ApiServer;
use crate::api::auth::claims;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{ENV_LOG, SUPER_ADMIN_TTL_HOURS};
use crate::data::Db;
use crate::domain::TeamService;
use crate::events::EventBus;
use crate::utils::mail::Mailer;

pub struct CoreApp {
    pub config: AppConfig,
    pub db: Db,
    pub bus: Arc<EventBus>,
    pub teams: Arc<TeamService>,
    pub mailer: Option<Arc<Mailer>>,
    /// Signing key shared by every claim kind
    pub key: Arc<Vec<u8>>,
}

impl CoreApp {
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Keygen { key, exp }) => return Self::handle_keygen(key, exp),
            Some(Commands::Serve) | None => {}
        }

        Self::init_logging();
        let app = Self::init(&cli_config).await?;
        ApiServer::new(app).start().await
    }

    fn init_logging() {
        let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let db = Db::connect(&config.database.url)
            .await
            .context("failed connecting to database")?;
        let _sweeper = db.spawn_cleanup();

        let bus = Arc::new(EventBus::new());
        let teams = Arc::new(TeamService::new(db.pool().clone()));

        let mailer = match &config.mail {
            Some(mail_config) => Some(Arc::new(
                Mailer::new(mail_config).context("failed to build mail client")?,
            )),
            None => {
                tracing::warn!("mail provider not configured, password reset mail disabled");
                None
            }
        };

        let key = Arc::new(config.auth.jwt_key.clone().into_bytes());

        Ok(Self {
            config,
            db,
            bus,
            teams,
            mailer,
            key,
        })
    }

    /// One-shot super-admin token generator. Any missing or invalid
    /// argument (and a signing failure) surfaces as an error, which the
    /// entry point turns into exit code 1.
    fn handle_keygen(key: Option<String>, exp: Option<String>) -> Result<()> {
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("--key is required"))?;

        let exp: DateTime<Utc> = match exp {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|_| anyhow!("--exp invalid time"))?
                .with_timezone(&Utc),
            None => Utc::now() + Duration::hours(SUPER_ADMIN_TTL_HOURS),
        };

        let token = claims::new_super_admin_token(exp, key.as_bytes())
            .context("signing failure")?;
        println!("Token successfully generated: {}", token);
        Ok(())
    }
}
