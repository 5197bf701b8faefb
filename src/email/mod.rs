use async_trait::async_trait;

use crate::config::EmailConfig;
use crate::errors::AppError;
use crate::models::User;

/// Outbound notification collaborator. The core only knows this seam;
/// delivery failures surface as `AppError::Dispatch` and the caller decides
/// whether that is fatal.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, user: &User, url: &str) -> Result<(), AppError>;

    /// The reset URL embeds the plaintext token; it must never appear in
    /// any response body or persisted record.
    async fn send_password_reset(&self, user: &User, reset_url: &str) -> Result<(), AppError>;
}

/// Log-only mailer. Stands in for a real transport in development; the
/// reset URL is deliberately kept out of the log line.
pub struct LogMailer {
    config: EmailConfig,
}

impl LogMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, user: &User, url: &str) -> Result<(), AppError> {
        log::info!(
            "welcome email from {} to {} (account page {})",
            self.config.from_address,
            user.email,
            url
        );
        Ok(())
    }

    async fn send_password_reset(&self, user: &User, _reset_url: &str) -> Result<(), AppError> {
        log::info!(
            "password reset email from {} to {}",
            self.config.from_address,
            user.email
        );
        Ok(())
    }
}
