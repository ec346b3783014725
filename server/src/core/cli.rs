use clap::{Parser, Subcommand};

use super::constants::{
    ENV_DATABASE_URL, ENV_JWT_KEY, ENV_MAILGUN_API_KEY, ENV_MAILGUN_DOMAIN, ENV_PORT,
};

#[derive(Parser)]
#[command(name = "matverseny")]
#[command(version, about = "Competition backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Store connection string
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,

    /// Signing key for bearer tokens
    #[arg(long, global = true, env = ENV_JWT_KEY)]
    pub jwt_key: Option<String>,

    /// Mail provider domain (password reset mail)
    #[arg(long, global = true, env = ENV_MAILGUN_DOMAIN)]
    pub mailgun_domain: Option<String>,

    /// Mail provider API key
    #[arg(long, global = true, env = ENV_MAILGUN_API_KEY)]
    pub mailgun_api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Generate a signed super-admin token and exit
    Keygen {
        /// Signing key, must match the server's JWT_KEY
        #[arg(long)]
        key: Option<String>,
        /// RFC3339 expiration instant (default: six months from now)
        #[arg(long)]
        exp: Option<String>,
    },
}

/// Parsed global CLI options, separated from the subcommand
pub struct CliConfig {
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub jwt_key: Option<String>,
    pub mailgun_domain: Option<String>,
    pub mailgun_api_key: Option<String>,
}

pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();

    let config = CliConfig {
        port: cli.port,
        database_url: cli.database_url,
        jwt_key: cli.jwt_key,
        mailgun_domain: cli.mailgun_domain,
        mailgun_api_key: cli.mailgun_api_key,
    };

    (config, cli.command)
}
