//! Outgoing mail (password reset)
//!
//! Thin client for a Mailgun-style messages API. Every send is bounded
//! by the mail deadline; the deployment may run without a mail plane,
//! in which case reset mails fail with the mail error.

use reqwest::Client;

use crate::core::config::MailConfig;
use crate::core::constants::MAIL_TIMEOUT;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail provider responded with status {0}")]
    Status(reqwest::StatusCode),
}

pub struct Mailer {
    client: Client,
    domain: String,
    api_key: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = Client::builder().timeout(MAIL_TIMEOUT).build()?;
        Ok(Self {
            client,
            domain: config.domain.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        let url = format!("https://api.mailgun.net/v3/{}/messages", self.domain);
        let from = format!("noreply@{}", self.domain);
        let body = format!(
            "A password reset was requested for this address.\n\n\
             Reset token: {token}\n\n\
             If this was not you, ignore this mail."
        );

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", from.as_str()),
                ("to", to),
                ("subject", "Password reset"),
                ("text", body.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Status(response.status()));
        }
        Ok(())
    }
}
