//! Outbound email seam for the password-reset flow.
//!
//! The core never sends mail itself; the caller takes the raw token from
//! [`crate::PasswordResetManager::create`], builds the link, and hands it to
//! a [`ResetMailer`]. The SMTP implementation here is the narrow default.

use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_SENDER: &str = "support@seruro.dev";

/// Delivery seam for password-reset links.
pub trait ResetMailer: Send + Sync {
    fn send_reset(&self, to: &str, reset_url: &str) -> Result<()>;
}

/// Credentials for the SMTP provider.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

pub struct SmtpMailer {
    sender: String,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = SmtpTransport::relay(&config.host)
            .context("failed to configure SMTP relay")?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ))
            .build();
        Ok(Self {
            sender: DEFAULT_SENDER.to_string(),
            transport,
        })
    }

    #[must_use]
    pub fn with_sender(mut self, sender: String) -> Self {
        self.sender = sender;
        self
    }
}

impl ResetMailer for SmtpMailer {
    fn send_reset(&self, to: &str, reset_url: &str) -> Result<()> {
        let message = reset_message(&self.sender, to, reset_url)?;
        self.transport
            .send(&message)
            .context("failed to send reset email")?;
        Ok(())
    }
}

/// Build the link embedded in the reset email.
#[must_use]
pub fn reset_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/reset-pw?token={token}")
}

fn reset_message(sender: &str, to: &str, reset_url: &str) -> Result<Message> {
    Message::builder()
        .from(sender.parse::<Mailbox>().context("invalid sender address")?)
        .to(to.parse::<Mailbox>().context("invalid recipient address")?)
        .subject("Reset your password")
        .body(format!(
            "To reset your password, please visit the following link:\n\
             {reset_url}\n\n\
             If you did not request a password reset, you can ignore this email.\n"
        ))
        .context("failed to build reset message")
}

#[cfg(test)]
mod tests {
    use super::{reset_message, reset_url};

    #[test]
    fn reset_url_trims_trailing_slash() {
        let url = reset_url("https://seruro.dev/", "token");
        assert_eq!(url, "https://seruro.dev/reset-pw?token=token");
    }

    #[test]
    fn reset_message_carries_the_link() {
        let message = reset_message(
            "support@seruro.dev",
            "user@example.com",
            "https://seruro.dev/reset-pw?token=abc123",
        )
        .expect("message");
        let formatted = String::from_utf8(message.formatted()).expect("utf8");
        assert!(formatted.contains("reset-pw?token=abc123"));
        assert!(formatted.contains("Subject: Reset your password"));
    }

    #[test]
    fn reset_message_rejects_bad_addresses() {
        assert!(reset_message("not-an-address", "user@example.com", "url").is_err());
        assert!(reset_message("support@seruro.dev", "not-an-address", "url").is_err());
    }
}
