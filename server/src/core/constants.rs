//! Application-wide constants

use std::time::Duration;

/// Environment variable for log filtering
pub const ENV_LOG: &str = "MATVERSENY_LOG";
/// Environment variable for the listen port
pub const ENV_PORT: &str = "PORT";
/// Environment variable for the store connection string
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable for the token signing key
pub const ENV_JWT_KEY: &str = "JWT_KEY";
/// Environment variable for the mail provider domain
pub const ENV_MAILGUN_DOMAIN: &str = "MAILGUN_DOMAIN";
/// Environment variable for the mail provider API key
pub const ENV_MAILGUN_API_KEY: &str = "MAILGUN_API_KEY";

/// Default listen port
pub const DEFAULT_PORT: u16 = 6969;
/// Default store connection string (file database in the working directory)
pub const DEFAULT_DATABASE_URL: &str = "sqlite://matverseny.db?mode=rwc";

/// Issuer stamped into every signed claim
pub const JWT_ISSUER: &str = "verseghy-matverseny";
/// Access token lifetime
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
/// Refresh token lifetime (six months)
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 180;
/// Default super-admin token lifetime used by the keygen command
/// (half a year)
pub const SUPER_ADMIN_TTL_HOURS: i64 = 24 * 365 / 2;
/// Password reset token lifetime
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Per-subscriber event buffer; a subscriber that falls this far behind
/// is disconnected and expected to reconnect and re-snapshot.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Width of one results bucket
pub const RESULTS_PERIOD: Duration = Duration::from_secs(30);

/// Team name limit in code points
pub const TEAM_NAME_MAX_CHARS: usize = 64;
/// Join code alphabet
pub const JOIN_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Join code length
pub const JOIN_CODE_LEN: usize = 6;
/// Attempts before join code generation gives up
pub const JOIN_CODE_RETRIES: usize = 10;

/// Store connect timeout at startup
pub const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a connection waits on a locked database before giving up
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for a single outgoing mail
pub const MAIL_TIMEOUT: Duration = Duration::from_secs(10);
/// Interval between expired password-reset sweeps
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// SSE keep-alive interval for streaming endpoints
pub const SSE_KEEP_ALIVE: Duration = Duration::from_secs(30);
